use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::get,
    Json,
};
use bookstore_dal::{
    book::{BookRepository, CreateBook, UpdateBook},
    catalog::{AnnotatedBook, CatalogQuery},
};
use bookstore_types::claim::ApiClaim;
use http::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use super::parse_ordering;
use crate::{
    auth::actor_id,
    error::{ApiError, ApiResult},
    permission::can_modify,
    state::AppState,
    validate::Garde,
};

crate::repository_from_request!(BookRepository);

const MAX_SEARCH_LEN: usize = 255;

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct BookListParams {
    /// Words to look for in book name or author name
    pub search: Option<String>,
    /// Comma separated fields, prefix `-` for descending order
    pub ordering: Option<String>,
}

impl BookListParams {
    pub fn into_catalog_query(self) -> ApiResult<CatalogQuery> {
        let search = self.search.filter(|s| !s.trim().is_empty());
        if let Some(ref search) = search {
            if search.chars().count() > MAX_SEARCH_LEN {
                return Err(ApiError::InvalidQuery("Search too long".to_string()));
            }
        }
        let order = match self.ordering.as_deref().map(str::trim) {
            None | Some("") => Vec::new(),
            Some(ordering) => parse_ordering(ordering)?,
        };
        Ok(CatalogQuery { search, order })
    }
}

#[cfg(feature = "openapi")]
#[derive(utoipa::OpenApi)]
#[openapi(paths(list, get_book, create, update, delete))]
struct ModuleDocs;

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;
    ModuleDocs::openapi()
}

#[cfg_attr(feature = "openapi",  utoipa::path(get, path = "", tag = "Books", operation_id = "listBooks",
    params(BookListParams),
    responses((status = 200, description = "Books with like counts and ratings", body = Vec<AnnotatedBook>),
        (status = 400, description = "Invalid ordering or search"))))]
pub async fn list(
    repository: BookRepository,
    Query(params): Query<BookListParams>,
) -> ApiResult<Json<Vec<AnnotatedBook>>> {
    debug!("Listing books: {params:?}");
    let query = params.into_catalog_query()?;
    let books = repository.list(query).await?;
    Ok(Json(books))
}

#[cfg_attr(feature = "openapi",  utoipa::path(get, path = "/{id}", tag = "Books", operation_id = "getBook",
    responses((status = 200, description = "Book", body = AnnotatedBook),
        (status = 404, description = "Book not found"))))]
pub async fn get_book(
    Path(id): Path<i64>,
    repository: BookRepository,
) -> ApiResult<Json<AnnotatedBook>> {
    let book = repository.get(id).await?;
    Ok(Json(book))
}

#[cfg_attr(feature = "openapi",  utoipa::path(post, path = "", tag = "Books", operation_id = "createBook",
    request_body = CreateBook,
    responses((status = 201, description = "Created book, owned by requester", body = AnnotatedBook))))]
pub async fn create(
    claim: ApiClaim,
    repository: BookRepository,
    Garde(Json(payload)): Garde<Json<CreateBook>>,
) -> ApiResult<impl IntoResponse> {
    let owner_id = actor_id(&claim)?;
    let book = repository
        .create(payload, owner_id)
        .await
        .map_err(|e| {
            if e.is_not_found() {
                debug!("Token owner {owner_id} no longer exists");
                ApiError::Unauthenticated
            } else {
                e.into()
            }
        })?;
    info!("User {owner_id} created book {}", book.id);
    Ok((StatusCode::CREATED, Json(book)))
}

#[cfg_attr(feature = "openapi",  utoipa::path(put, path = "/{id}", tag = "Books", operation_id = "updateBook",
    request_body = UpdateBook,
    responses((status = 200, description = "Updated book", body = AnnotatedBook),
        (status = 403, description = "Not owner nor staff"))))]
pub async fn update(
    Path(id): Path<i64>,
    claim: ApiClaim,
    repository: BookRepository,
    Garde(Json(payload)): Garde<Json<UpdateBook>>,
) -> ApiResult<Json<AnnotatedBook>> {
    let existing = repository.get_record(id).await?;
    can_modify(&claim, &existing).enforce()?;
    let book = repository.update(id, payload).await?;
    Ok(Json(book))
}

#[cfg_attr(feature = "openapi",  utoipa::path(delete, path = "/{id}", tag = "Books", operation_id = "deleteBook",
    responses((status = 204, description = "Deleted successfully"),
        (status = 403, description = "Not owner nor staff"))))]
pub async fn delete(
    Path(id): Path<i64>,
    claim: ApiClaim,
    repository: BookRepository,
) -> ApiResult<impl IntoResponse> {
    let existing = repository.get_record(id).await?;
    can_modify(&claim, &existing).enforce()?;
    repository.delete(id).await?;
    info!("Book {id} deleted by {}", claim.sub);
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_book).put(update).delete(delete))
}
