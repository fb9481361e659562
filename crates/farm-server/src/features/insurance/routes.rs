use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use super::models::{
    CompleteInsuranceRequest, CreateInsuranceRequest, InsuranceFilter, InsuranceRequest,
    RejectInsuranceRequest,
};
use super::repository::InsuranceRepository;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::response::{ApiResponse, ApiResult};
use crate::features::shared::Paginated;
use crate::middleware::Actor;

type Repo = Arc<dyn InsuranceRepository>;

pub fn insurance_routes() -> Router<Repo> {
    Router::new()
        .route("/", get(list_requests).post(create_request))
        .route("/:id", get(get_request))
        .route("/:id/approve", post(approve))
        .route("/:id/reject", post(reject))
        .route("/:id/cancel", post(cancel))
        .route("/:id/complete", post(complete))
}

#[tracing::instrument(skip(repo, req), fields(livestock_id = %req.livestock_id))]
async fn create_request(
    State(repo): State<Repo>,
    actor: Actor,
    ApiJson(req): ApiJson<CreateInsuranceRequest>,
) -> ApiResult<ApiResponse<InsuranceRequest>> {
    req.validate()?;
    let request = repo.create(req, actor.id()).await?;
    Ok(ApiResponse::created(request).with_message("Insurance request created"))
}

#[tracing::instrument(skip(repo))]
async fn list_requests(
    State(repo): State<Repo>,
    ApiQuery(filter): ApiQuery<InsuranceFilter>,
) -> ApiResult<ApiResponse<Paginated<InsuranceRequest>>> {
    Ok(ApiResponse::ok(repo.list(filter).await?))
}

#[tracing::instrument(skip(repo))]
async fn get_request(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<InsuranceRequest>> {
    Ok(ApiResponse::ok(repo.get(id).await?))
}

#[tracing::instrument(skip(repo))]
async fn approve(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<InsuranceRequest>> {
    let request = repo.approve(id, actor.id()).await?;
    Ok(ApiResponse::ok(request).with_message("Insurance request approved"))
}

#[tracing::instrument(skip(repo, req))]
async fn reject(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<RejectInsuranceRequest>,
) -> ApiResult<ApiResponse<InsuranceRequest>> {
    req.validate()?;
    let request = repo.reject(id, req.reason, actor.id()).await?;
    Ok(ApiResponse::ok(request).with_message("Insurance request rejected"))
}

#[tracing::instrument(skip(repo))]
async fn cancel(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<InsuranceRequest>> {
    let request = repo.cancel(id, actor.id()).await?;
    Ok(ApiResponse::ok(request).with_message("Insurance request cancelled"))
}

#[tracing::instrument(skip(repo, req), fields(replacement = %req.replacement_livestock_id))]
async fn complete(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CompleteInsuranceRequest>,
) -> ApiResult<ApiResponse<InsuranceRequest>> {
    let request = repo
        .complete(id, req.replacement_livestock_id, actor.id())
        .await?;
    Ok(ApiResponse::ok(request).with_message("Insurance request completed"))
}
