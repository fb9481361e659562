use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use super::models::{Order, OrderFilter, OrderRequest, OrderWithLines};
use super::repository::OrderRepository;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::response::{ApiResponse, ApiResult};
use crate::features::shared::Paginated;
use crate::middleware::Actor;

type Repo = Arc<dyn OrderRepository>;

pub fn orders_routes() -> Router<Repo> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order))
        .route("/:id/confirm", post(confirm))
        .route("/:id/complete", post(complete))
        .route("/:id/cancel", post(cancel))
}

#[tracing::instrument(skip(repo, req), fields(customer = %req.customer_name))]
async fn create_order(
    State(repo): State<Repo>,
    actor: Actor,
    ApiJson(req): ApiJson<OrderRequest>,
) -> ApiResult<ApiResponse<OrderWithLines>> {
    req.validate()?;
    let order = repo.create(req, actor.id()).await?;
    Ok(ApiResponse::created(order).with_message("Order created"))
}

#[tracing::instrument(skip(repo))]
async fn list_orders(
    State(repo): State<Repo>,
    ApiQuery(filter): ApiQuery<OrderFilter>,
) -> ApiResult<ApiResponse<Paginated<Order>>> {
    Ok(ApiResponse::ok(repo.list(filter).await?))
}

#[tracing::instrument(skip(repo))]
async fn get_order(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<OrderWithLines>> {
    Ok(ApiResponse::ok(repo.get(id).await?))
}

#[tracing::instrument(skip(repo))]
async fn confirm(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Order>> {
    let order = repo.confirm(id, actor.id()).await?;
    Ok(ApiResponse::ok(order).with_message("Order confirmed"))
}

#[tracing::instrument(skip(repo))]
async fn complete(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Order>> {
    let order = repo.complete(id, actor.id()).await?;
    Ok(ApiResponse::ok(order).with_message("Order completed"))
}

#[tracing::instrument(skip(repo))]
async fn cancel(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Order>> {
    let order = repo.cancel(id, actor.id()).await?;
    Ok(ApiResponse::ok(order).with_message("Order cancelled"))
}
