use std::collections::BTreeMap;

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde_json::json;
use tracing::{debug, error};

pub type ApiResult<T, E = ApiError> = std::result::Result<T, E>;

/// Error messages keyed by payload field
pub type FieldErrors = BTreeMap<String, Vec<String>>;

const NON_FIELD_ERRORS: &str = "non_field_errors";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid payload: {0:?}")]
    Validation(FieldErrors),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn field(name: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(name.into(), vec![message.into()]);
        ApiError::Validation(fields)
    }

    /// Payload that could not be parsed at all
    pub fn malformed(message: impl ToString) -> Self {
        Self::field(NON_FIELD_ERRORS, message.to_string())
    }
}

impl From<garde::Report> for ApiError {
    fn from(report: garde::Report) -> Self {
        let mut fields = FieldErrors::new();
        for (path, err) in report.iter() {
            let name = path.to_string();
            let name = if name.is_empty() {
                NON_FIELD_ERRORS.to_string()
            } else {
                name
            };
            fields.entry(name).or_default().push(err.to_string());
        }
        ApiError::Validation(fields)
    }
}

impl From<bookstore_dal::Error> for ApiError {
    fn from(e: bookstore_dal::Error) -> Self {
        use bookstore_dal::Error;
        match e {
            Error::RecordNotFound(what) => ApiError::NotFound(what),
            Error::DatabaseError(bookstore_dal::SqlxError::RowNotFound) => {
                ApiError::NotFound("Record".to_string())
            }
            Error::InvalidOrderByField(field) => {
                ApiError::InvalidQuery(format!("Invalid ordering field: {field}"))
            }
            Error::InvalidRate(rate) => {
                ApiError::field("rate", format!("{rate} is not a valid choice, use 1 to 5"))
            }
            Error::InvalidCredentials => ApiError::Unauthenticated,
            Error::RecordExists(what) => ApiError::Conflict(what),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<bookstore_auth::error::Error> for ApiError {
    fn from(e: bookstore_auth::error::Error) -> Self {
        ApiError::Internal(format!("Token error: {e}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(fields) => {
                debug!("Validation failed: {fields:?}");
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "validation", "fields": fields})),
                )
                    .into_response()
            }
            ApiError::InvalidQuery(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "invalid_query", "message": message})),
            )
                .into_response(),
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED.into_response(),
            ApiError::Forbidden(message) => (
                StatusCode::FORBIDDEN,
                Json(json!({"error": "forbidden", "message": message})),
            )
                .into_response(),
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "not_found", "message": format!("{what} not found")})),
            )
                .into_response(),
            ApiError::Conflict(message) => (
                StatusCode::CONFLICT,
                Json(json!({"error": "conflict", "message": message})),
            )
                .into_response(),
            ApiError::Internal(message) => {
                error!("Internal error: {message}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "internal"})),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use garde::Validate;

    use super::*;

    #[derive(Validate)]
    struct Payload {
        #[garde(range(min = 1, max = 5))]
        rate: i64,
        #[garde(length(min = 1))]
        name: String,
    }

    #[test]
    fn test_report_to_fields() {
        let payload = Payload {
            rate: 6,
            name: String::new(),
        };
        let err: ApiError = payload.validate().unwrap_err().into();
        match err {
            ApiError::Validation(fields) => {
                let names: Vec<_> = fields.keys().map(String::as_str).collect();
                assert_eq!(names, ["name", "rate"]);
                assert_eq!(fields["rate"].len(), 1);
            }
            other => panic!("Unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_dal_mapping() {
        let err = ApiError::from(bookstore_dal::Error::RecordNotFound("Book".into()));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let err = ApiError::from(bookstore_dal::Error::InvalidOrderByField("owner".into()));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err = ApiError::from(bookstore_dal::Error::InvalidRate(6));
        assert!(matches!(err, ApiError::Validation(ref f) if f.contains_key("rate")));

        let err = ApiError::from(bookstore_dal::Error::DatabaseError(
            bookstore_dal::SqlxError::PoolClosed,
        ));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
