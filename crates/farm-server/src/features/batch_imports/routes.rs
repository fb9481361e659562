use std::sync::Arc;

use axum::{
    extract::State,
    routing::{delete, get, post},
    Router,
};
use uuid::Uuid;

use super::models::{
    AddImportLivestockRequest, BatchImport, BatchImportFilter, BatchImportRequest,
    BatchImportWithDetails,
};
use super::repository::BatchImportRepository;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::response::{ApiResponse, ApiResult};
use crate::features::shared::Paginated;
use crate::middleware::Actor;

type Repo = Arc<dyn BatchImportRepository>;

pub fn batch_imports_routes() -> Router<Repo> {
    Router::new()
        .route("/", get(list_imports).post(create_import))
        .route("/:id", get(get_import).put(update_import).delete(delete_import))
        .route("/:id/livestock", post(add_livestock))
        .route("/:id/livestock/:livestock_id", delete(remove_livestock))
        .route("/:id/complete", post(complete_import))
        .route("/:id/cancel", post(cancel_import))
}

#[tracing::instrument(skip(repo, req), fields(name = %req.name))]
async fn create_import(
    State(repo): State<Repo>,
    actor: Actor,
    ApiJson(req): ApiJson<BatchImportRequest>,
) -> ApiResult<ApiResponse<BatchImport>> {
    req.validate()?;
    let batch = repo.create(req, actor.id()).await?;

    tracing::info!(batch_import_id = %batch.id, "Batch import created");
    Ok(ApiResponse::created(batch).with_message("Batch import created"))
}

#[tracing::instrument(skip(repo))]
async fn list_imports(
    State(repo): State<Repo>,
    ApiQuery(filter): ApiQuery<BatchImportFilter>,
) -> ApiResult<ApiResponse<Paginated<BatchImport>>> {
    Ok(ApiResponse::ok(repo.list(filter).await?))
}

#[tracing::instrument(skip(repo))]
async fn get_import(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<BatchImportWithDetails>> {
    Ok(ApiResponse::ok(repo.get(id).await?))
}

#[tracing::instrument(skip(repo, req))]
async fn update_import(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<BatchImportRequest>,
) -> ApiResult<ApiResponse<BatchImport>> {
    req.validate()?;
    let batch = repo.update(id, req, actor.id()).await?;
    Ok(ApiResponse::ok(batch).with_message("Batch import updated"))
}

#[tracing::instrument(skip(repo), fields(livestock_id = %req.livestock_id))]
async fn add_livestock(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<AddImportLivestockRequest>,
) -> ApiResult<ApiResponse<BatchImportWithDetails>> {
    let batch = repo.add_livestock(id, req.livestock_id, actor.id()).await?;
    Ok(ApiResponse::ok(batch).with_message("Livestock added to batch import"))
}

#[tracing::instrument(skip(repo))]
async fn remove_livestock(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath((id, livestock_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<BatchImportWithDetails>> {
    let batch = repo.remove_livestock(id, livestock_id, actor.id()).await?;
    Ok(ApiResponse::ok(batch).with_message("Livestock removed from batch import"))
}

#[tracing::instrument(skip(repo))]
async fn complete_import(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<BatchImport>> {
    let batch = repo.complete(id, actor.id()).await?;
    Ok(ApiResponse::ok(batch).with_message("Batch import completed"))
}

#[tracing::instrument(skip(repo))]
async fn cancel_import(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<BatchImport>> {
    let batch = repo.cancel(id, actor.id()).await?;
    Ok(ApiResponse::ok(batch).with_message("Batch import cancelled"))
}

#[tracing::instrument(skip(repo))]
async fn delete_import(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Uuid>> {
    repo.delete(id).await?;

    tracing::info!(batch_import_id = %id, "Batch import deleted");
    Ok(ApiResponse::ok(id).with_message("Batch import deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::Repositories;
    use crate::features::barns::BarnRequest;
    use crate::features::livestock::CreateLivestockRequest;
    use crate::features::shared::test_helpers::{id_of, send, TestRequest};
    use crate::features::species::CreateSpeciesRequest;
    use axum::http::StatusCode;
    use farm_common::types::{Gender, SpeciesType};
    use serde_json::{json, Value};

    struct Fixture {
        repos: Repositories,
        app: Router,
        species_id: Uuid,
        barn_id: Uuid,
    }

    async fn setup() -> Fixture {
        let repos = MemoryStore::shared().repositories();
        let species = repos
            .species
            .create(
                CreateSpeciesRequest {
                    name: "Lợn".into(),
                    description: None,
                    species_type: SpeciesType::Pig,
                },
                None,
            )
            .await
            .unwrap();
        let barn = repos
            .barns
            .create(
                BarnRequest {
                    name: "Chuồng A".into(),
                    address: "Ấp 3, Xuân Lộc".into(),
                    owner: "Nguyễn Văn An".into(),
                    capacity: 50,
                },
                None,
            )
            .await
            .unwrap();
        let app = batch_imports_routes().with_state(repos.batch_imports.clone());
        Fixture {
            repos,
            app,
            species_id: species.id,
            barn_id: barn.id,
        }
    }

    impl Fixture {
        async fn animal(&self, code: &str) -> Uuid {
            self.repos
                .livestock
                .create(
                    CreateLivestockRequest {
                        inspection_code: Some(code.into()),
                        species_id: self.species_id,
                        barn_id: None,
                        gender: Gender::Female,
                        color: None,
                        weight_kg: 80.0,
                        date_of_birth: None,
                        origin: None,
                        status: None,
                    },
                    None,
                )
                .await
                .unwrap()
                .id
        }

        async fn batch(&self, expected: i32) -> String {
            let (status, body) = send(
                self.app.clone(),
                TestRequest::post(
                    "/",
                    json!({
                        "name": "Lô nhập tháng 3",
                        "supplier": "Trại giống Đồng Nai",
                        "barn_id": self.barn_id,
                        "expected_quantity": expected,
                        "expected_import_date": "2026-03-01"
                    }),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
            id_of(&body)
        }

        async fn add(&self, batch: &str, livestock: Uuid) -> (StatusCode, Value) {
            send(
                self.app.clone(),
                TestRequest::post(
                    &format!("/{}/livestock", batch),
                    json!({ "livestock_id": livestock }),
                ),
            )
            .await
        }
    }

    #[tokio::test]
    async fn test_create_starts_pending() {
        let fx = setup().await;
        let id = fx.batch(2).await;
        let (status, body) = send(fx.app.clone(), TestRequest::get(&format!("/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "PENDING");
        assert_eq!(body["data"]["imported_quantity"], 0);
        assert_eq!(body["data"]["details"], json!([]));
    }

    #[tokio::test]
    async fn test_create_rejects_zero_quantity() {
        let fx = setup().await;
        let (status, body) = send(
            fx.app,
            TestRequest::post(
                "/",
                json!({
                    "name": "Lô lỗi",
                    "supplier": "NCC",
                    "expected_quantity": 0,
                    "expected_import_date": "2026-03-01"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"][0]["field"], "expected_quantity");
    }

    #[tokio::test]
    async fn test_adding_livestock_progresses_and_completes() {
        let fx = setup().await;
        let id = fx.batch(2).await;
        let first = fx.animal("P-001").await;
        let second = fx.animal("P-002").await;

        let (status, body) = fx.add(&id, first).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "IMPORTING");
        assert_eq!(body["data"]["details"][0]["inspection_code"], "P-001");

        // barn of the batch is assigned to the animal
        let animal = fx.repos.livestock.get(first).await.unwrap();
        assert_eq!(animal.barn_id, Some(fx.barn_id));

        let (_, body) = fx.add(&id, second).await;
        assert_eq!(body["data"]["status"], "COMPLETED");
        assert_eq!(body["data"]["imported_quantity"], 2);
        assert!(body["data"]["completed_at"].is_string());

        let third = fx.animal("P-003").await;
        let (status, _) = fx.add(&id, third).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_livestock_joins_only_one_import() {
        let fx = setup().await;
        let a = fx.batch(3).await;
        let b = fx.batch(3).await;
        let animal = fx.animal("P-010").await;

        fx.add(&a, animal).await;
        let (status, body) = fx.add(&b, animal).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["message"].as_str().unwrap().contains("already exists"));
    }

    #[tokio::test]
    async fn test_unknown_livestock_is_bad_request() {
        let fx = setup().await;
        let id = fx.batch(1).await;
        let (status, _) = fx.add(&id, Uuid::new_v4()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_remove_then_cancel_then_delete() {
        let fx = setup().await;
        let id = fx.batch(3).await;
        let animal = fx.animal("P-020").await;
        fx.add(&id, animal).await;

        let (status, _) = send(fx.app.clone(), TestRequest::delete(&format!("/{}", id))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(
            fx.app.clone(),
            TestRequest::delete(&format!("/{}/livestock/{}", id, animal)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["imported_quantity"], 0);

        let (status, body) =
            send(fx.app.clone(), TestRequest::action(&format!("/{}/cancel", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "CANCELLED");

        let (status, _) = send(fx.app.clone(), TestRequest::delete(&format!("/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(fx.app, TestRequest::get(&format!("/{}", id))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_complete_requires_importing() {
        let fx = setup().await;
        let id = fx.batch(3).await;

        let (status, body) =
            send(fx.app.clone(), TestRequest::action(&format!("/{}/complete", id))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Cannot complete batch import in status PENDING");

        fx.add(&id, fx.animal("P-030").await).await;
        let (status, body) =
            send(fx.app.clone(), TestRequest::action(&format!("/{}/complete", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "COMPLETED");

        let (status, _) = send(fx.app, TestRequest::action(&format!("/{}/cancel", id))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_update_only_while_pending() {
        let fx = setup().await;
        let id = fx.batch(3).await;
        let body = json!({
            "name": "Lô đổi tên",
            "supplier": "NCC mới",
            "expected_quantity": 4,
            "expected_import_date": "2026-04-01"
        });

        let (status, resp) =
            send(fx.app.clone(), TestRequest::put(&format!("/{}", id), body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["data"]["expected_quantity"], 4);

        fx.add(&id, fx.animal("P-040").await).await;
        let (status, _) = send(fx.app, TestRequest::put(&format!("/{}", id), body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let fx = setup().await;
        let a = fx.batch(2).await;
        fx.batch(2).await;
        fx.add(&a, fx.animal("P-050").await).await;

        let (_, body) = send(fx.app.clone(), TestRequest::get("/?status=IMPORTING")).await;
        assert_eq!(body["data"]["pagination"]["total"], 1);
        let (_, body) = send(fx.app, TestRequest::get("/?keyword=%C4%91%E1%BB%93ng%20nai")).await;
        assert_eq!(body["data"]["pagination"]["total"], 2);
    }
}
