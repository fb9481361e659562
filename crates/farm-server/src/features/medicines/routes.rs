use std::sync::Arc;

use axum::{extract::State, routing::get, Router};
use uuid::Uuid;

use super::models::{Medicine, MedicineFilter, MedicineRequest};
use super::repository::MedicineRepository;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::response::{ApiResponse, ApiResult};
use crate::features::shared::Paginated;
use crate::middleware::Actor;

type Repo = Arc<dyn MedicineRepository>;

pub fn medicines_routes() -> Router<Repo> {
    Router::new()
        .route("/", get(list_medicines).post(create_medicine))
        .route(
            "/:id",
            get(get_medicine).put(update_medicine).delete(delete_medicine),
        )
}

#[tracing::instrument(skip(repo, req), fields(name = %req.name, medicine_type = %req.medicine_type))]
async fn create_medicine(
    State(repo): State<Repo>,
    actor: Actor,
    ApiJson(req): ApiJson<MedicineRequest>,
) -> ApiResult<ApiResponse<Medicine>> {
    req.validate()?;
    let medicine = repo.create(req, actor.id()).await?;
    Ok(ApiResponse::created(medicine).with_message("Medicine created"))
}

#[tracing::instrument(skip(repo))]
async fn list_medicines(
    State(repo): State<Repo>,
    ApiQuery(filter): ApiQuery<MedicineFilter>,
) -> ApiResult<ApiResponse<Paginated<Medicine>>> {
    Ok(ApiResponse::ok(repo.list(filter).await?))
}

#[tracing::instrument(skip(repo))]
async fn get_medicine(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Medicine>> {
    Ok(ApiResponse::ok(repo.get(id).await?))
}

#[tracing::instrument(skip(repo, req))]
async fn update_medicine(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<MedicineRequest>,
) -> ApiResult<ApiResponse<Medicine>> {
    req.validate()?;
    let medicine = repo.update(id, req, actor.id()).await?;
    Ok(ApiResponse::ok(medicine).with_message("Medicine updated"))
}

#[tracing::instrument(skip(repo))]
async fn delete_medicine(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Uuid>> {
    repo.delete(id).await?;

    tracing::info!(medicine_id = %id, "Medicine deleted");
    Ok(ApiResponse::ok(id).with_message("Medicine deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::Repositories;
    use crate::features::diseases::DiseaseRequest;
    use crate::features::shared::test_helpers::{id_of, send, TestRequest};
    use axum::http::StatusCode;
    use farm_common::types::DiseaseType;
    use serde_json::json;

    async fn setup() -> (Repositories, Router, Uuid, Uuid) {
        let repos = MemoryStore::shared().repositories();
        let mut ids = Vec::new();
        for name in ["Lở mồm long móng", "Viêm phổi"] {
            let disease = repos
                .diseases
                .create(
                    DiseaseRequest {
                        name: name.into(),
                        symptom: None,
                        description: None,
                        disease_type: DiseaseType::Infectious,
                    },
                    None,
                )
                .await
                .unwrap();
            ids.push(disease.id);
        }
        let app = medicines_routes().with_state(repos.medicines.clone());
        (repos, app, ids[0], ids[1])
    }

    #[tokio::test]
    async fn test_create_links_diseases() {
        let (_, app, fmd, pneumonia) = setup().await;
        let (status, body) = send(
            app.clone(),
            TestRequest::post(
                "/",
                json!({"name": "Aftovax", "medicine_type": "VACCINE", "disease_ids": [fmd]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["disease_ids"], json!([fmd]));

        send(
            app.clone(),
            TestRequest::post(
                "/",
                json!({"name": "Tylosin", "medicine_type": "TREATMENT", "disease_ids": [pneumonia]}),
            ),
        )
        .await;

        let (_, body) = send(app.clone(), TestRequest::get(&format!("/?disease_id={}", fmd))).await;
        assert_eq!(body["data"]["pagination"]["total"], 1);
        assert_eq!(body["data"]["items"][0]["name"], "Aftovax");

        let (_, body) = send(app, TestRequest::get("/?medicine_type=TREATMENT")).await;
        assert_eq!(body["data"]["items"][0]["name"], "Tylosin");
    }

    #[tokio::test]
    async fn test_update_replaces_links() {
        let (_, app, fmd, pneumonia) = setup().await;
        let (_, created) = send(
            app.clone(),
            TestRequest::post(
                "/",
                json!({"name": "Đa giá", "medicine_type": "VACCINE", "disease_ids": [fmd]}),
            ),
        )
        .await;
        let id = id_of(&created);

        let (status, body) = send(
            app,
            TestRequest::put(
                &format!("/{}", id),
                json!({"name": "Đa giá", "medicine_type": "VACCINE", "disease_ids": [pneumonia]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["disease_ids"], json!([pneumonia]));
    }

    #[tokio::test]
    async fn test_unknown_disease_is_400() {
        let (_, app, _, _) = setup().await;
        let (status, body) = send(
            app,
            TestRequest::post(
                "/",
                json!({"name": "Lạ", "medicine_type": "TREATMENT", "disease_ids": [Uuid::new_v4()]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let (_, app, _, _) = setup().await;
        let req = json!({"name": "Ivermectin", "medicine_type": "TREATMENT"});
        send(app.clone(), TestRequest::post("/", req.clone())).await;
        let (status, _) = send(app, TestRequest::post("/", req)).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
