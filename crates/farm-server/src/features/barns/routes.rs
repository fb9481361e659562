use std::sync::Arc;

use axum::{extract::State, routing::get, Router};
use uuid::Uuid;

use super::models::{Barn, BarnFilter, BarnRequest};
use super::repository::BarnRepository;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::response::{ApiResponse, ApiResult};
use crate::features::shared::Paginated;
use crate::middleware::Actor;

type Repo = Arc<dyn BarnRepository>;

pub fn barns_routes() -> Router<Repo> {
    Router::new()
        .route("/", get(list_barns).post(create_barn))
        .route("/:id", get(get_barn).put(update_barn).delete(delete_barn))
}

#[tracing::instrument(skip(repo, req), fields(name = %req.name))]
async fn create_barn(
    State(repo): State<Repo>,
    actor: Actor,
    ApiJson(req): ApiJson<BarnRequest>,
) -> ApiResult<ApiResponse<Barn>> {
    req.validate()?;
    let barn = repo.create(req, actor.id()).await?;

    tracing::info!(barn_id = %barn.id, "Barn created");
    Ok(ApiResponse::created(barn).with_message("Barn created"))
}

#[tracing::instrument(skip(repo))]
async fn list_barns(
    State(repo): State<Repo>,
    ApiQuery(filter): ApiQuery<BarnFilter>,
) -> ApiResult<ApiResponse<Paginated<Barn>>> {
    Ok(ApiResponse::ok(repo.list(filter).await?))
}

#[tracing::instrument(skip(repo))]
async fn get_barn(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Barn>> {
    Ok(ApiResponse::ok(repo.get(id).await?))
}

#[tracing::instrument(skip(repo, req))]
async fn update_barn(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<BarnRequest>,
) -> ApiResult<ApiResponse<Barn>> {
    req.validate()?;
    let barn = repo.update(id, req, actor.id()).await?;

    tracing::info!(barn_id = %id, "Barn updated");
    Ok(ApiResponse::ok(barn).with_message("Barn updated"))
}

#[tracing::instrument(skip(repo))]
async fn delete_barn(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Uuid>> {
    repo.delete(id).await?;

    tracing::info!(barn_id = %id, "Barn deleted");
    Ok(ApiResponse::ok(id).with_message("Barn deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::features::shared::test_helpers::{id_of, send, TestRequest};
    use crate::features::livestock::CreateLivestockRequest;
    use crate::features::species::CreateSpeciesRequest;
    use axum::http::StatusCode;
    use farm_common::types::{Gender, SpeciesType};
    use serde_json::json;

    fn barn(name: &str) -> serde_json::Value {
        json!({"name": name, "address": "Xã Tân Phú", "owner": "Trại Đông", "capacity": 50})
    }

    #[tokio::test]
    async fn test_create_get_update() {
        let app = barns_routes().with_state(MemoryStore::shared().repositories().barns);

        let (status, created) = send(app.clone(), TestRequest::post("/", barn("Chuồng 1"))).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = id_of(&created);

        let mut body = barn("Chuồng 1");
        body["capacity"] = json!(80);
        let (status, updated) = send(app.clone(), TestRequest::put(&format!("/{}", id), body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["data"]["capacity"], 80);

        let (_, fetched) = send(app, TestRequest::get(&format!("/{}", id))).await;
        assert_eq!(fetched["data"]["capacity"], 80);
    }

    #[tokio::test]
    async fn test_negative_capacity_is_422() {
        let app = barns_routes().with_state(MemoryStore::shared().repositories().barns);
        let mut body = barn("Chuồng 2");
        body["capacity"] = json!(-5);
        let (status, body) = send(app, TestRequest::post("/", body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"][0]["field"], "capacity");
    }

    #[tokio::test]
    async fn test_delete_housed_barn_conflicts() {
        let repos = MemoryStore::shared().repositories();
        let app = barns_routes().with_state(repos.barns.clone());

        let (_, created) = send(app.clone(), TestRequest::post("/", barn("Chuồng 3"))).await;
        let barn_id: Uuid = id_of(&created).parse().unwrap();

        let species = repos
            .species
            .create(
                CreateSpeciesRequest {
                    name: "Dê".into(),
                    description: None,
                    species_type: SpeciesType::Goat,
                },
                None,
            )
            .await
            .unwrap();
        repos
            .livestock
            .create(
                CreateLivestockRequest {
                    inspection_code: Some("G-01".into()),
                    species_id: species.id,
                    barn_id: Some(barn_id),
                    gender: Gender::Female,
                    color: None,
                    weight_kg: 40.0,
                    date_of_birth: None,
                    origin: None,
                    status: None,
                },
                None,
            )
            .await
            .unwrap();

        let (status, body) = send(app, TestRequest::delete(&format!("/{}", barn_id))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["statusCode"], 409);
    }
}
