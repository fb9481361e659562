use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use super::models::{AllocateCodeRequest, AllocatedCode, CodeRange, CodeRangeFilter, CreateCodeRangeRequest};
use super::repository::CodeRangeRepository;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::response::{ApiResponse, ApiResult};
use crate::features::shared::Paginated;
use crate::middleware::Actor;

type Repo = Arc<dyn CodeRangeRepository>;

pub fn code_ranges_routes() -> Router<Repo> {
    Router::new()
        .route("/", get(list_ranges).post(create_range))
        .route("/allocate", post(allocate_code))
        .route("/:id", get(get_range).delete(delete_range))
}

#[tracing::instrument(skip(repo, req), fields(species_id = %req.species_id))]
async fn create_range(
    State(repo): State<Repo>,
    actor: Actor,
    ApiJson(req): ApiJson<CreateCodeRangeRequest>,
) -> ApiResult<ApiResponse<CodeRange>> {
    req.validate()?;
    let range = repo.create(req, actor.id()).await?;

    tracing::info!(
        range_id = %range.id,
        start = range.start_code,
        end = range.end_code,
        "Inspection code range created"
    );
    Ok(ApiResponse::created(range).with_message("Code range created"))
}

#[tracing::instrument(skip(repo))]
async fn list_ranges(
    State(repo): State<Repo>,
    ApiQuery(filter): ApiQuery<CodeRangeFilter>,
) -> ApiResult<ApiResponse<Paginated<CodeRange>>> {
    Ok(ApiResponse::ok(repo.list(filter).await?))
}

#[tracing::instrument(skip(repo))]
async fn get_range(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<CodeRange>> {
    Ok(ApiResponse::ok(repo.get(id).await?))
}

#[tracing::instrument(skip(repo))]
async fn delete_range(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Uuid>> {
    repo.delete(id).await?;
    tracing::info!(range_id = %id, "Inspection code range deleted");
    Ok(ApiResponse::ok(id).with_message("Code range deleted"))
}

#[tracing::instrument(skip(repo, req), fields(species_id = %req.species_id))]
async fn allocate_code(
    State(repo): State<Repo>,
    ApiJson(req): ApiJson<AllocateCodeRequest>,
) -> ApiResult<ApiResponse<AllocatedCode>> {
    let allocated = repo.allocate_next(req.species_id).await?;
    tracing::info!(code = %allocated.code, "Inspection code allocated");
    Ok(ApiResponse::ok(allocated))
}
