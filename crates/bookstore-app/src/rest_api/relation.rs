use axum::{extract::Path, routing::get, Json};
use bookstore_dal::relation::{PatchRelation, RelationRepository, UpdateRelation, UserBookRelation};
use bookstore_types::claim::ApiClaim;
use tracing::debug;

use crate::{auth::actor_id, error::ApiResult, state::AppState, validate::Garde};

crate::repository_from_request!(RelationRepository);

#[cfg(feature = "openapi")]
#[derive(utoipa::OpenApi)]
#[openapi(paths(get_relation, patch_relation, put_relation))]
struct ModuleDocs;

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;
    ModuleDocs::openapi()
}

#[cfg_attr(feature = "openapi",  utoipa::path(get, path = "/{book_id}", tag = "Relations", operation_id = "getRelation",
    responses((status = 200, description = "Relation of current user to the book", body = UserBookRelation),
        (status = 404, description = "Book not found"))))]
pub async fn get_relation(
    Path(book_id): Path<i64>,
    claim: ApiClaim,
    repository: RelationRepository,
) -> ApiResult<Json<UserBookRelation>> {
    let user_id = actor_id(&claim)?;
    let relation = repository.get(user_id, book_id).await?;
    Ok(Json(relation))
}

#[cfg_attr(feature = "openapi",  utoipa::path(patch, path = "/{book_id}", tag = "Relations", operation_id = "patchRelation",
    request_body = PatchRelation,
    responses((status = 200, description = "Updated relation", body = UserBookRelation),
        (status = 400, description = "Invalid rate"),
        (status = 404, description = "Book not found"))))]
pub async fn patch_relation(
    Path(book_id): Path<i64>,
    claim: ApiClaim,
    repository: RelationRepository,
    Garde(Json(patch)): Garde<Json<PatchRelation>>,
) -> ApiResult<Json<UserBookRelation>> {
    let user_id = actor_id(&claim)?;
    debug!("User {user_id} patches relation to book {book_id}");
    let relation = repository.upsert(user_id, book_id, patch).await?;
    Ok(Json(relation))
}

#[cfg_attr(feature = "openapi",  utoipa::path(put, path = "/{book_id}", tag = "Relations", operation_id = "putRelation",
    request_body = UpdateRelation,
    responses((status = 200, description = "Replaced relation", body = UserBookRelation),
        (status = 400, description = "Invalid rate"),
        (status = 404, description = "Book not found"))))]
pub async fn put_relation(
    Path(book_id): Path<i64>,
    claim: ApiClaim,
    repository: RelationRepository,
    Garde(Json(update)): Garde<Json<UpdateRelation>>,
) -> ApiResult<Json<UserBookRelation>> {
    let user_id = actor_id(&claim)?;
    let relation = repository.upsert(user_id, book_id, update.into()).await?;
    Ok(Json(relation))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route(
        "/{book_id}",
        get(get_relation).patch(patch_relation).put(put_relation),
    )
}
