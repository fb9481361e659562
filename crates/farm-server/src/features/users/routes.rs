use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use super::models::{User, UserFilter, UserRequest};
use super::repository::UserRepository;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::response::{ApiResponse, ApiResult};
use crate::features::shared::Paginated;
use crate::middleware::Actor;

type Repo = Arc<dyn UserRepository>;

pub fn users_routes() -> Router<Repo> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
        .route("/:id/activate", post(activate))
        .route("/:id/deactivate", post(deactivate))
}

#[tracing::instrument(skip(repo, req), fields(username = %req.username))]
async fn create_user(
    State(repo): State<Repo>,
    actor: Actor,
    ApiJson(req): ApiJson<UserRequest>,
) -> ApiResult<ApiResponse<User>> {
    req.validate()?;
    let user = repo.create(req, actor.id()).await?;
    Ok(ApiResponse::created(user).with_message("User created"))
}

#[tracing::instrument(skip(repo))]
async fn list_users(
    State(repo): State<Repo>,
    ApiQuery(filter): ApiQuery<UserFilter>,
) -> ApiResult<ApiResponse<Paginated<User>>> {
    Ok(ApiResponse::ok(repo.list(filter).await?))
}

#[tracing::instrument(skip(repo))]
async fn get_user(State(repo): State<Repo>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<ApiResponse<User>> {
    Ok(ApiResponse::ok(repo.get(id).await?))
}

#[tracing::instrument(skip(repo, req))]
async fn update_user(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UserRequest>,
) -> ApiResult<ApiResponse<User>> {
    req.validate()?;
    let user = repo.update(id, req, actor.id()).await?;
    Ok(ApiResponse::ok(user).with_message("User updated"))
}

#[tracing::instrument(skip(repo))]
async fn activate(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<User>> {
    let user = repo.set_active(id, true, actor.id()).await?;
    Ok(ApiResponse::ok(user).with_message("User activated"))
}

#[tracing::instrument(skip(repo))]
async fn deactivate(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<User>> {
    let user = repo.set_active(id, false, actor.id()).await?;
    Ok(ApiResponse::ok(user).with_message("User deactivated"))
}

#[tracing::instrument(skip(repo))]
async fn delete_user(State(repo): State<Repo>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<ApiResponse<Uuid>> {
    repo.delete(id).await?;

    tracing::info!(user_id = %id, "User deleted");
    Ok(ApiResponse::ok(id).with_message("User deleted"))
}
