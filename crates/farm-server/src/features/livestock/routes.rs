use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, put},
    Router,
};
use uuid::Uuid;

use super::models::{
    ChangeStatusRequest, CreateLivestockRequest, Livestock, LivestockFilter, LivestockSummary,
    UpdateLivestockRequest, VaccinationHistoryEntry,
};
use super::repository::LivestockRepository;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::response::{ApiResponse, ApiResult};
use crate::features::shared::Paginated;
use crate::middleware::Actor;

type Repo = Arc<dyn LivestockRepository>;

pub fn livestock_routes() -> Router<Repo> {
    Router::new()
        .route("/", get(list_livestock).post(create_livestock))
        .route("/summary", get(summary))
        .route("/code/:code", get(get_by_code))
        .route(
            "/:id",
            get(get_livestock).put(update_livestock).delete(delete_livestock),
        )
        .route("/:id/status", put(change_status))
        .route("/:id/vaccinations", get(vaccination_history))
}

#[tracing::instrument(skip(repo, req), fields(species_id = %req.species_id))]
async fn create_livestock(
    State(repo): State<Repo>,
    actor: Actor,
    ApiJson(req): ApiJson<CreateLivestockRequest>,
) -> ApiResult<ApiResponse<Livestock>> {
    req.validate()?;
    let livestock = repo.create(req, actor.id()).await?;

    tracing::info!(
        livestock_id = %livestock.id,
        inspection_code = %livestock.inspection_code,
        "Livestock registered"
    );
    Ok(ApiResponse::created(livestock).with_message("Livestock created"))
}

#[tracing::instrument(skip(repo))]
async fn list_livestock(
    State(repo): State<Repo>,
    ApiQuery(filter): ApiQuery<LivestockFilter>,
) -> ApiResult<ApiResponse<Paginated<Livestock>>> {
    Ok(ApiResponse::ok(repo.list(filter).await?))
}

#[tracing::instrument(skip(repo))]
async fn summary(State(repo): State<Repo>) -> ApiResult<ApiResponse<LivestockSummary>> {
    Ok(ApiResponse::ok(repo.summary().await?))
}

#[tracing::instrument(skip(repo))]
async fn get_by_code(
    State(repo): State<Repo>,
    ApiPath(code): ApiPath<String>,
) -> ApiResult<ApiResponse<Livestock>> {
    Ok(ApiResponse::ok(repo.get_by_code(&code).await?))
}

#[tracing::instrument(skip(repo))]
async fn get_livestock(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Livestock>> {
    Ok(ApiResponse::ok(repo.get(id).await?))
}

#[tracing::instrument(skip(repo, req))]
async fn update_livestock(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateLivestockRequest>,
) -> ApiResult<ApiResponse<Livestock>> {
    req.validate()?;
    let livestock = repo.update(id, req, actor.id()).await?;
    Ok(ApiResponse::ok(livestock).with_message("Livestock updated"))
}

#[tracing::instrument(skip(repo), fields(status = %req.status))]
async fn change_status(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<ChangeStatusRequest>,
) -> ApiResult<ApiResponse<Livestock>> {
    let livestock = repo.change_status(id, req.status, actor.id()).await?;
    Ok(ApiResponse::ok(livestock).with_message("Livestock status updated"))
}

#[tracing::instrument(skip(repo))]
async fn delete_livestock(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Uuid>> {
    repo.delete(id).await?;

    tracing::info!(livestock_id = %id, "Livestock deleted");
    Ok(ApiResponse::ok(id).with_message("Livestock deleted"))
}

#[tracing::instrument(skip(repo))]
async fn vaccination_history(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Vec<VaccinationHistoryEntry>>> {
    Ok(ApiResponse::ok(repo.vaccination_history(id).await?))
}
