use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use super::models::{
    AddExportLivestockRequest, BatchExport, BatchExportFilter, BatchExportRequest,
    BatchExportWithDetails,
};
use super::repository::BatchExportRepository;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::response::{ApiResponse, ApiResult};
use crate::features::shared::Paginated;
use crate::middleware::Actor;

type Repo = Arc<dyn BatchExportRepository>;

pub fn batch_exports_routes() -> Router<Repo> {
    Router::new()
        .route("/", get(list_exports).post(create_export))
        .route("/:id", get(get_export).put(update_export).delete(delete_export))
        .route("/:id/livestock", post(add_livestock))
        .route("/:id/complete", post(complete_export))
        .route("/:id/cancel", post(cancel_export))
}

#[tracing::instrument(skip(repo, req), fields(customer = %req.customer_name))]
async fn create_export(
    State(repo): State<Repo>,
    actor: Actor,
    ApiJson(req): ApiJson<BatchExportRequest>,
) -> ApiResult<ApiResponse<BatchExport>> {
    req.validate()?;
    let batch = repo.create(req, actor.id()).await?;

    tracing::info!(batch_export_id = %batch.id, warranty_days = batch.warranty_days, "Batch export created");
    Ok(ApiResponse::created(batch).with_message("Batch export created"))
}

#[tracing::instrument(skip(repo))]
async fn list_exports(
    State(repo): State<Repo>,
    ApiQuery(filter): ApiQuery<BatchExportFilter>,
) -> ApiResult<ApiResponse<Paginated<BatchExport>>> {
    Ok(ApiResponse::ok(repo.list(filter).await?))
}

#[tracing::instrument(skip(repo))]
async fn get_export(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<BatchExportWithDetails>> {
    Ok(ApiResponse::ok(repo.get(id).await?))
}

#[tracing::instrument(skip(repo, req))]
async fn update_export(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<BatchExportRequest>,
) -> ApiResult<ApiResponse<BatchExport>> {
    req.validate()?;
    let batch = repo.update(id, req, actor.id()).await?;
    Ok(ApiResponse::ok(batch).with_message("Batch export updated"))
}

#[tracing::instrument(skip(repo), fields(livestock_id = %req.livestock_id))]
async fn add_livestock(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<AddExportLivestockRequest>,
) -> ApiResult<ApiResponse<BatchExportWithDetails>> {
    req.validate()?;
    let batch = repo
        .add_livestock(id, req.livestock_id, req.unit_price, actor.id())
        .await?;
    Ok(ApiResponse::ok(batch).with_message("Livestock added to batch export"))
}

#[tracing::instrument(skip(repo))]
async fn complete_export(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<BatchExport>> {
    let batch = repo.complete(id, actor.id()).await?;
    Ok(ApiResponse::ok(batch).with_message("Batch export completed"))
}

#[tracing::instrument(skip(repo))]
async fn cancel_export(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<BatchExport>> {
    let batch = repo.cancel(id, actor.id()).await?;
    Ok(ApiResponse::ok(batch).with_message("Batch export cancelled"))
}

#[tracing::instrument(skip(repo))]
async fn delete_export(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Uuid>> {
    repo.delete(id).await?;

    tracing::info!(batch_export_id = %id, "Batch export deleted");
    Ok(ApiResponse::ok(id).with_message("Batch export deleted"))
}
