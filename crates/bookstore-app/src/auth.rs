use axum::{
    extract::{FromRequestParts, State},
    routing::post,
    Json, RequestPartsExt,
};
use axum_extra::TypedHeader;
use bookstore_dal::user::UserRepository;
use bookstore_types::claim::{ApiClaim, Authorization as _};
use garde::Validate;
use headers::{authorization::Bearer, Authorization};
use http::request::Parts;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    validate::Garde,
};

impl FromRequestParts<AppState> for ApiClaim {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|e| {
                debug!("No bearer token: {e}");
                ApiError::Unauthenticated
            })?;

        state
            .tokens()
            .validate::<ApiClaim>(bearer.token())
            .map_err(|e| {
                debug!("Failed to validate token: {e}");
                ApiError::Unauthenticated
            })
    }
}

/// Database id of authenticated user
pub fn actor_id(claim: &ApiClaim) -> ApiResult<i64> {
    claim.user_id().ok_or_else(|| {
        debug!("Token subject {} is not user id", claim.sub);
        ApiError::Unauthenticated
    })
}

/// Claim of authenticated user with staff role, otherwise request is rejected
/// with 401 (no valid token) or 403 (not staff)
pub struct StaffClaim(pub ApiClaim);

impl FromRequestParts<AppState> for StaffClaim {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claim = ApiClaim::from_request_parts(parts, state).await?;
        if claim.is_staff() {
            Ok(StaffClaim(claim))
        } else {
            Err(ApiError::Forbidden("Staff role required".to_string()))
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LoginCredentials {
    #[garde(length(min = 1, max = 150))]
    pub username: String,
    #[garde(length(min = 1, max = 255))]
    pub password: String,
}

#[cfg(feature = "openapi")]
#[derive(utoipa::OpenApi)]
#[openapi(paths(login))]
struct ModuleDocs;

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;
    ModuleDocs::openapi()
}

#[cfg_attr(feature = "openapi",  utoipa::path(post, path = "/login", tag = "Auth", operation_id = "login",
    request_body = LoginCredentials,
    responses((status = 200, description = "Signed API token", body = String),
        (status = 401, description = "Invalid credentials"))))]
pub async fn login(
    State(state): State<AppState>,
    user_registry: UserRepository,
    Garde(Json(credentials)): Garde<Json<LoginCredentials>>,
) -> ApiResult<String> {
    let user = user_registry
        .check_password(&credentials.username, &credentials.password)
        .await?;

    let claim = ApiClaim::new_expired(user.id.to_string(), user.roles());
    let token = state.tokens().issue(claim)?;
    info!("User {} logged in", user.username);
    Ok(token)
}

/// Builds authentication router - must be nested on /auth path!
pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/login", post(login))
}
