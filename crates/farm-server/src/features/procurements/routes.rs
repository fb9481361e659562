use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use uuid::Uuid;

use super::models::{
    ProcurementFilter, ProcurementPackage, ProcurementRequest, ProcurementWithDetails,
};
use super::repository::ProcurementRepository;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::response::{ApiResponse, ApiResult};
use crate::features::shared::Paginated;
use crate::middleware::Actor;

type Repo = Arc<dyn ProcurementRepository>;

pub fn procurements_routes() -> Router<Repo> {
    Router::new()
        .route("/", get(list_packages).post(create_package))
        .route(
            "/:id",
            get(get_package).put(update_package).delete(delete_package),
        )
        .route("/:id/award", post(award))
        .route("/:id/close", post(close))
        .route("/:id/cancel", post(cancel))
}

#[tracing::instrument(skip(repo, req), fields(code = %req.code))]
async fn create_package(
    State(repo): State<Repo>,
    actor: Actor,
    ApiJson(req): ApiJson<ProcurementRequest>,
) -> ApiResult<ApiResponse<ProcurementWithDetails>> {
    req.validate(Utc::now())?;
    let package = repo.create(req, actor.id()).await?;
    Ok(ApiResponse::created(package).with_message("Procurement package created"))
}

#[tracing::instrument(skip(repo))]
async fn list_packages(
    State(repo): State<Repo>,
    ApiQuery(filter): ApiQuery<ProcurementFilter>,
) -> ApiResult<ApiResponse<Paginated<ProcurementPackage>>> {
    Ok(ApiResponse::ok(repo.list(filter).await?))
}

#[tracing::instrument(skip(repo))]
async fn get_package(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<ProcurementWithDetails>> {
    Ok(ApiResponse::ok(repo.get(id).await?))
}

#[tracing::instrument(skip(repo, req))]
async fn update_package(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<ProcurementRequest>,
) -> ApiResult<ApiResponse<ProcurementWithDetails>> {
    req.validate(Utc::now())?;
    let package = repo.update(id, req, actor.id()).await?;
    Ok(ApiResponse::ok(package).with_message("Procurement package updated"))
}

#[tracing::instrument(skip(repo))]
async fn award(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<ProcurementPackage>> {
    let package = repo.award(id, actor.id()).await?;
    Ok(ApiResponse::ok(package).with_message("Procurement package awarded"))
}

#[tracing::instrument(skip(repo))]
async fn close(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<ProcurementPackage>> {
    let package = repo.close(id, actor.id()).await?;
    Ok(ApiResponse::ok(package).with_message("Procurement package closed"))
}

#[tracing::instrument(skip(repo))]
async fn cancel(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<ProcurementPackage>> {
    let package = repo.cancel(id, actor.id()).await?;
    Ok(ApiResponse::ok(package).with_message("Procurement package cancelled"))
}

#[tracing::instrument(skip(repo))]
async fn delete_package(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Uuid>> {
    repo.delete(id).await?;

    tracing::info!(procurement_id = %id, "Procurement package deleted");
    Ok(ApiResponse::ok(id).with_message("Procurement package deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::features::shared::test_helpers::{id_of, send, TestRequest};
    use crate::features::species::CreateSpeciesRequest;
    use axum::http::StatusCode;
    use chrono::Duration;
    use farm_common::types::SpeciesType;
    use serde_json::{json, Value};

    async fn setup() -> (Arc<MemoryStore>, Router, Uuid) {
        let store = MemoryStore::shared();
        let repos = store.repositories();
        let species = repos
            .species
            .create(
                CreateSpeciesRequest {
                    name: "Bò lai Sind".into(),
                    description: None,
                    species_type: SpeciesType::Cattle,
                },
                None,
            )
            .await
            .unwrap();
        let app = procurements_routes().with_state(repos.procurements.clone());
        (store, app, species.id)
    }

    fn body(code: &str, species_id: Uuid) -> Value {
        json!({
            "code": code,
            "name": "Cung cấp bò giống cho hộ nghèo",
            "owner": "UBND xã Tân Hiệp",
            "expired_at": Utc::now() + Duration::days(30),
            "details": [{
                "species_id": species_id,
                "required_quantity": 20,
                "min_weight_kg": 150.0,
                "max_weight_kg": 220.0
            }]
        })
    }

    #[tokio::test]
    async fn test_create_with_details() {
        let (_, app, species_id) = setup().await;
        let (status, resp) = send(app, TestRequest::post("/", body("GT-001", species_id))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(resp["data"]["status"], "OPEN");
        assert_eq!(resp["data"]["details"][0]["required_quantity"], 20);
    }

    #[tokio::test]
    async fn test_duplicate_code_conflicts() {
        let (_, app, species_id) = setup().await;
        send(app.clone(), TestRequest::post("/", body("GT-002", species_id))).await;
        let (status, _) = send(app, TestRequest::post("/", body("GT-002", species_id))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_unknown_species_is_400() {
        let (_, app, _) = setup().await;
        let (status, _) = send(app, TestRequest::post("/", body("GT-003", Uuid::new_v4()))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_award_close_lifecycle() {
        let (_, app, species_id) = setup().await;
        let (_, created) = send(app.clone(), TestRequest::post("/", body("GT-004", species_id))).await;
        let id = id_of(&created);

        let (status, resp) = send(app.clone(), TestRequest::action(&format!("/{}/award", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["data"]["status"], "AWARDED");

        let (status, _) = send(app.clone(), TestRequest::put(&format!("/{}", id), body("GT-004", species_id))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(app.clone(), TestRequest::action(&format!("/{}/cancel", id))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, resp) = send(app.clone(), TestRequest::action(&format!("/{}/close", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["data"]["status"], "CLOSED");

        let (status, _) = send(app, TestRequest::delete(&format!("/{}", id))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_update_replaces_details() {
        let (_, app, species_id) = setup().await;
        let (_, created) = send(app.clone(), TestRequest::post("/", body("GT-005", species_id))).await;
        let id = id_of(&created);

        let mut updated = body("GT-005", species_id);
        updated["details"] = json!([
            {"species_id": species_id, "required_quantity": 5, "min_weight_kg": 100.0, "max_weight_kg": 120.0},
            {"species_id": species_id, "required_quantity": 7, "min_weight_kg": 120.0, "max_weight_kg": 140.0}
        ]);
        let (status, resp) = send(app, TestRequest::put(&format!("/{}", id), updated)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["data"]["details"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_expired_package_reads_expired() {
        let (store, app, species_id) = setup().await;
        let (_, created) = send(app.clone(), TestRequest::post("/", body("GT-006", species_id))).await;
        let id: Uuid = id_of(&created).parse().unwrap();

        store.backdate_procurement(id, Utc::now() - Duration::hours(1)).await;

        let (_, resp) = send(app.clone(), TestRequest::get(&format!("/{}", id))).await;
        assert_eq!(resp["data"]["status"], "EXPIRED");

        let (_, resp) = send(app.clone(), TestRequest::get("/?status=EXPIRED")).await;
        assert_eq!(resp["data"]["pagination"]["total"], 1);

        let (status, _) = send(app, TestRequest::action(&format!("/{}/award", id))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_past_expiry_is_422() {
        let (_, app, species_id) = setup().await;
        let mut req = body("GT-007", species_id);
        req["expired_at"] = json!(Utc::now() - Duration::days(1));
        let (status, resp) = send(app, TestRequest::post("/", req)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(resp["errors"][0]["field"], "expired_at");
    }
}
