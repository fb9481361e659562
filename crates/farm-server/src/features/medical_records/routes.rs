use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use super::models::{MedicalRecord, MedicalRecordFilter, MedicalRecordRequest};
use super::repository::MedicalRecordRepository;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::response::{ApiResponse, ApiResult};
use crate::features::shared::Paginated;
use crate::middleware::Actor;

type Repo = Arc<dyn MedicalRecordRepository>;

pub fn medical_records_routes() -> Router<Repo> {
    Router::new()
        .route("/", get(list_records).post(create_record))
        .route("/:id", get(get_record))
        .route("/:id/recover", post(recover))
        .route("/:id/dead", post(mark_dead))
}

#[tracing::instrument(skip(repo, req), fields(livestock_id = %req.livestock_id))]
async fn create_record(
    State(repo): State<Repo>,
    actor: Actor,
    ApiJson(req): ApiJson<MedicalRecordRequest>,
) -> ApiResult<ApiResponse<MedicalRecord>> {
    req.validate()?;
    let record = repo.create(req, actor.id()).await?;
    Ok(ApiResponse::created(record).with_message("Medical record created"))
}

#[tracing::instrument(skip(repo))]
async fn list_records(
    State(repo): State<Repo>,
    ApiQuery(filter): ApiQuery<MedicalRecordFilter>,
) -> ApiResult<ApiResponse<Paginated<MedicalRecord>>> {
    Ok(ApiResponse::ok(repo.list(filter).await?))
}

#[tracing::instrument(skip(repo))]
async fn get_record(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<MedicalRecord>> {
    Ok(ApiResponse::ok(repo.get(id).await?))
}

#[tracing::instrument(skip(repo))]
async fn recover(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<MedicalRecord>> {
    let record = repo.recover(id, actor.id()).await?;
    Ok(ApiResponse::ok(record).with_message("Livestock recovered"))
}

#[tracing::instrument(skip(repo))]
async fn mark_dead(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<MedicalRecord>> {
    let record = repo.mark_dead(id, actor.id()).await?;
    Ok(ApiResponse::ok(record).with_message("Livestock marked dead"))
}
