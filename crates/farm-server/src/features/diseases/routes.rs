use std::sync::Arc;

use axum::{extract::State, routing::get, Router};
use uuid::Uuid;

use super::models::{Disease, DiseaseFilter, DiseaseRequest};
use super::repository::DiseaseRepository;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::response::{ApiResponse, ApiResult};
use crate::features::shared::Paginated;
use crate::middleware::Actor;

type Repo = Arc<dyn DiseaseRepository>;

pub fn diseases_routes() -> Router<Repo> {
    Router::new()
        .route("/", get(list_diseases).post(create_disease))
        .route(
            "/:id",
            get(get_disease).put(update_disease).delete(delete_disease),
        )
}

#[tracing::instrument(skip(repo, req), fields(name = %req.name))]
async fn create_disease(
    State(repo): State<Repo>,
    actor: Actor,
    ApiJson(req): ApiJson<DiseaseRequest>,
) -> ApiResult<ApiResponse<Disease>> {
    req.validate()?;
    let disease = repo.create(req, actor.id()).await?;
    Ok(ApiResponse::created(disease).with_message("Disease created"))
}

#[tracing::instrument(skip(repo))]
async fn list_diseases(
    State(repo): State<Repo>,
    ApiQuery(filter): ApiQuery<DiseaseFilter>,
) -> ApiResult<ApiResponse<Paginated<Disease>>> {
    Ok(ApiResponse::ok(repo.list(filter).await?))
}

#[tracing::instrument(skip(repo))]
async fn get_disease(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Disease>> {
    Ok(ApiResponse::ok(repo.get(id).await?))
}

#[tracing::instrument(skip(repo, req))]
async fn update_disease(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<DiseaseRequest>,
) -> ApiResult<ApiResponse<Disease>> {
    req.validate()?;
    let disease = repo.update(id, req, actor.id()).await?;
    Ok(ApiResponse::ok(disease).with_message("Disease updated"))
}

#[tracing::instrument(skip(repo))]
async fn delete_disease(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Uuid>> {
    repo.delete(id).await?;

    tracing::info!(disease_id = %id, "Disease deleted");
    Ok(ApiResponse::ok(id).with_message("Disease deleted"))
}
