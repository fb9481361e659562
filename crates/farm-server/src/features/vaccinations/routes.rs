use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use super::models::{
    AddVaccinatedLivestockRequest, BatchVaccination, BatchVaccinationWithDetails,
    VaccinationFilter, VaccinationRequest,
};
use super::repository::VaccinationRepository;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::response::{ApiResponse, ApiResult};
use crate::features::shared::Paginated;
use crate::middleware::Actor;

type Repo = Arc<dyn VaccinationRepository>;

pub fn vaccinations_routes() -> Router<Repo> {
    Router::new()
        .route("/", get(list_vaccinations).post(create_vaccination))
        .route(
            "/:id",
            get(get_vaccination)
                .put(update_vaccination)
                .delete(delete_vaccination),
        )
        .route("/:id/livestock", post(add_livestock))
        .route("/:id/complete", post(complete_vaccination))
        .route("/:id/cancel", post(cancel_vaccination))
}

#[tracing::instrument(skip(repo, req), fields(medicine_id = %req.medicine_id))]
async fn create_vaccination(
    State(repo): State<Repo>,
    actor: Actor,
    ApiJson(req): ApiJson<VaccinationRequest>,
) -> ApiResult<ApiResponse<BatchVaccination>> {
    req.validate()?;
    let batch = repo.create(req, actor.id()).await?;

    tracing::info!(batch_vaccination_id = %batch.id, scheduled_at = %batch.scheduled_at, "Vaccination scheduled");
    Ok(ApiResponse::created(batch).with_message("Batch vaccination created"))
}

#[tracing::instrument(skip(repo))]
async fn list_vaccinations(
    State(repo): State<Repo>,
    ApiQuery(filter): ApiQuery<VaccinationFilter>,
) -> ApiResult<ApiResponse<Paginated<BatchVaccination>>> {
    Ok(ApiResponse::ok(repo.list(filter).await?))
}

#[tracing::instrument(skip(repo))]
async fn get_vaccination(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<BatchVaccinationWithDetails>> {
    Ok(ApiResponse::ok(repo.get(id).await?))
}

#[tracing::instrument(skip(repo, req))]
async fn update_vaccination(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<VaccinationRequest>,
) -> ApiResult<ApiResponse<BatchVaccination>> {
    req.validate()?;
    let batch = repo.update(id, req, actor.id()).await?;
    Ok(ApiResponse::ok(batch).with_message("Batch vaccination updated"))
}

#[tracing::instrument(skip(repo), fields(livestock_id = %req.livestock_id))]
async fn add_livestock(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<AddVaccinatedLivestockRequest>,
) -> ApiResult<ApiResponse<BatchVaccinationWithDetails>> {
    let batch = repo
        .add_livestock(id, req.livestock_id, req.vaccinated_at, actor.id())
        .await?;
    Ok(ApiResponse::ok(batch).with_message("Livestock vaccinated"))
}

#[tracing::instrument(skip(repo))]
async fn complete_vaccination(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<BatchVaccination>> {
    let batch = repo.complete(id, actor.id()).await?;
    Ok(ApiResponse::ok(batch).with_message("Batch vaccination completed"))
}

#[tracing::instrument(skip(repo))]
async fn cancel_vaccination(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<BatchVaccination>> {
    let batch = repo.cancel(id, actor.id()).await?;
    Ok(ApiResponse::ok(batch).with_message("Batch vaccination cancelled"))
}

#[tracing::instrument(skip(repo))]
async fn delete_vaccination(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Uuid>> {
    repo.delete(id).await?;

    tracing::info!(batch_vaccination_id = %id, "Batch vaccination deleted");
    Ok(ApiResponse::ok(id).with_message("Batch vaccination deleted"))
}
