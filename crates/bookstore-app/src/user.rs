use crate::{auth::StaffClaim, error::ApiResult, repository_from_request, validate::Garde};
use bookstore_dal::user::{CreateUser, User, UserRepository};

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{delete, post},
    Json,
};
use http::StatusCode;
use tracing::info;

use crate::state::AppState;

repository_from_request!(UserRepository);

const MAX_USERS_LISTED: usize = 1000;

#[cfg(feature = "openapi")]
#[derive(utoipa::OpenApi)]
#[openapi(paths(create_user, list_users, delete_user))]
struct ModuleDocs;

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;
    ModuleDocs::openapi()
}

#[cfg_attr(feature = "openapi",  utoipa::path(post, path = "", tag = "Users", operation_id = "createUser",
    request_body = CreateUser,
    responses((status = 201, description = "Create new User", body = User),
        (status = 403, description = "Staff role required"),
        (status = 409, description = "Username already taken"))))]
pub async fn create_user(
    StaffClaim(claim): StaffClaim,
    user_registry: UserRepository,
    Garde(Json(payload)): Garde<Json<CreateUser>>,
) -> ApiResult<impl IntoResponse> {
    let user: User = user_registry.create(payload).await?;
    info!("User {} created by {}", user.username, claim.sub);

    Ok((StatusCode::CREATED, Json(user)))
}

#[cfg_attr(feature = "openapi",  utoipa::path(get, path = "", tag = "Users", operation_id = "listUsers",
    responses((status = 200, description = "List Users", body = Vec<User>))))]
async fn list_users(
    _staff: StaffClaim,
    user_registry: UserRepository,
) -> ApiResult<impl IntoResponse> {
    let users = user_registry.list(MAX_USERS_LISTED).await?;
    Ok((StatusCode::OK, Json(users)))
}

#[cfg_attr(feature = "openapi",  utoipa::path(delete, path = "/{id}", tag = "Users", operation_id = "deleteUser",
    responses((status = 204, description = "Deleted successfully"))))]
async fn delete_user(
    Path(id): Path<i64>,
    StaffClaim(claim): StaffClaim,
    user_registry: UserRepository,
) -> ApiResult<impl IntoResponse> {
    user_registry.delete(id).await?;
    info!("User {id} deleted by {}", claim.sub);

    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", post(create_user).get(list_users))
        .route("/{id}", delete(delete_user))
}
