use std::sync::Arc;

use axum::{extract::State, routing::get, Router};
use uuid::Uuid;

use super::models::{CreateSpeciesRequest, Species, SpeciesFilter, UpdateSpeciesRequest};
use super::repository::SpeciesRepository;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::response::{ApiResponse, ApiResult};
use crate::features::shared::Paginated;
use crate::middleware::Actor;

type Repo = Arc<dyn SpeciesRepository>;

pub fn species_routes() -> Router<Repo> {
    Router::new()
        .route("/", get(list_species).post(create_species))
        .route(
            "/:id",
            get(get_species).put(update_species).delete(delete_species),
        )
}

#[tracing::instrument(skip(repo, req), fields(name = %req.name))]
async fn create_species(
    State(repo): State<Repo>,
    actor: Actor,
    ApiJson(req): ApiJson<CreateSpeciesRequest>,
) -> ApiResult<ApiResponse<Species>> {
    req.validate()?;
    let species = repo.create(req, actor.id()).await?;

    tracing::info!(species_id = %species.id, "Species created");
    Ok(ApiResponse::created(species).with_message("Species created"))
}

#[tracing::instrument(skip(repo))]
async fn list_species(
    State(repo): State<Repo>,
    ApiQuery(filter): ApiQuery<SpeciesFilter>,
) -> ApiResult<ApiResponse<Paginated<Species>>> {
    Ok(ApiResponse::ok(repo.list(filter).await?))
}

#[tracing::instrument(skip(repo))]
async fn get_species(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Species>> {
    Ok(ApiResponse::ok(repo.get(id).await?))
}

#[tracing::instrument(skip(repo, req))]
async fn update_species(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateSpeciesRequest>,
) -> ApiResult<ApiResponse<Species>> {
    req.validate()?;
    let species = repo.update(id, req, actor.id()).await?;

    tracing::info!(species_id = %id, "Species updated");
    Ok(ApiResponse::ok(species).with_message("Species updated"))
}

#[tracing::instrument(skip(repo))]
async fn delete_species(
    State(repo): State<Repo>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Uuid>> {
    repo.delete(id).await?;

    tracing::info!(species_id = %id, "Species deleted");
    Ok(ApiResponse::ok(id).with_message("Species deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::features::shared::test_helpers::{send, TestRequest};
    use axum::http::StatusCode;
    use serde_json::json;

    fn app() -> Router {
        species_routes().with_state(MemoryStore::shared().repositories().species)
    }

    #[tokio::test]
    async fn test_create_returns_201_with_id() {
        let (status, body) = send(
            app(),
            TestRequest::post("/", json!({"name": "Bò vàng", "species_type": "CATTLE"})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["statusCode"], 201);
        assert_eq!(body["data"]["species_type"], "CATTLE");
        assert!(body["data"]["id"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let app = app();
        let req = json!({"name": "Heo", "species_type": "PIG"});
        send(app.clone(), TestRequest::post("/", req.clone())).await;
        let (status, body) = send(app, TestRequest::post("/", req)).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_invalid_body_uses_envelope() {
        let (status, body) = send(
            app(),
            TestRequest::post("/", json!({"name": "", "species_type": "CATTLE"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"][0]["field"], "name");

        let (status, body) = send(
            app(),
            TestRequest::post("/", json!({"name": "Dê", "species_type": "DRAGON"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["statusCode"], 422);
    }

    #[tokio::test]
    async fn test_get_unknown_is_404() {
        let (status, body) = send(app(), TestRequest::get(&format!("/{}", Uuid::new_v4()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["statusCode"], 404);
    }

    #[tokio::test]
    async fn test_bad_path_id_is_400() {
        let (status, _) = send(app(), TestRequest::get("/not-a-uuid")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_filters_by_type() {
        let app = app();
        for (name, ty) in [("Bò", "CATTLE"), ("Trâu", "CATTLE"), ("Gà", "POULTRY")] {
            send(app.clone(), TestRequest::post("/", json!({"name": name, "species_type": ty})))
                .await;
        }

        let (status, body) = send(app, TestRequest::get("/?species_type=CATTLE&page_size=1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["pagination"]["total"], 2);
        assert_eq!(body["data"]["pagination"]["has_next"], true);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let app = app();
        let (_, created) = send(
            app.clone(),
            TestRequest::post("/", json!({"name": "Dê", "species_type": "GOAT"})),
        )
        .await;
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            app.clone(),
            TestRequest::put(
                &format!("/{}", id),
                json!({"name": "Dê núi", "species_type": "GOAT", "description": "mountain"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Dê núi");

        let (status, _) = send(app.clone(), TestRequest::delete(&format!("/{}", id))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(app, TestRequest::get(&format!("/{}", id))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
