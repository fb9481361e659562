use std::sync::Arc;

use axum::{extract::State, routing::get, Router};
use farm_common::types::PERMISSION_CATALOGUE;
use uuid::Uuid;

use super::models::{Role, RoleFilter, RoleRequest};
use super::repository::RoleRepository;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::response::{ApiResponse, ApiResult};
use crate::features::shared::Paginated;
use crate::middleware::Actor;

type Repo = Arc<dyn RoleRepository>;

pub fn roles_routes() -> Router<Repo> {
    Router::new()
        .route("/", get(list_roles).post(create_role))
        .route("/permissions", get(list_permissions))
        .route("/:id", get(get_role).put(update_role).delete(delete_role))
}

#[tracing::instrument(skip(repo, req), fields(name = %req.name))]
async fn create_role(
    State(repo): State<Repo>,
    actor: Actor,
    ApiJson(req): ApiJson<RoleRequest>,
) -> ApiResult<ApiResponse<Role>> {
    req.validate()?;
    let role = repo.create(req, actor.id()).await?;
    Ok(ApiResponse::created(role).with_message("Role created"))
}

#[tracing::instrument(skip(repo))]
async fn list_roles(
    State(repo): State<Repo>,
    ApiQuery(filter): ApiQuery<RoleFilter>,
) -> ApiResult<ApiResponse<Paginated<Role>>> {
    Ok(ApiResponse::ok(repo.list(filter).await?))
}

async fn list_permissions() -> ApiResponse<Vec<&'static str>> {
    ApiResponse::ok(PERMISSION_CATALOGUE.to_vec())
}

#[tracing::instrument(skip(repo))]
async fn get_role(State(repo): State<Repo>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<ApiResponse<Role>> {
    Ok(ApiResponse::ok(repo.get(id).await?))
}

#[tracing::instrument(skip(repo, req))]
async fn update_role(
    State(repo): State<Repo>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<RoleRequest>,
) -> ApiResult<ApiResponse<Role>> {
    req.validate()?;
    let role = repo.update(id, req, actor.id()).await?;
    Ok(ApiResponse::ok(role).with_message("Role updated"))
}

#[tracing::instrument(skip(repo))]
async fn delete_role(State(repo): State<Repo>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<ApiResponse<Uuid>> {
    repo.delete(id).await?;
    Ok(ApiResponse::ok(id).with_message("Role deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::features::shared::test_helpers::{id_of, send, TestRequest};
    use crate::features::users::UserRequest;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_role_crud() {
        let repos = MemoryStore::shared().repositories();
        let app = roles_routes().with_state(repos.roles.clone());

        let (status, created) = send(
            app.clone(),
            TestRequest::post(
                "/",
                json!({"name": "Kỹ thuật viên", "permissions": ["livestock.read", "livestock.write"]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = id_of(&created);

        let (status, resp) = send(
            app.clone(),
            TestRequest::put(
                &format!("/{}", id),
                json!({"name": "Kỹ thuật viên", "permissions": ["livestock.read"]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["data"]["permissions"], json!(["livestock.read"]));

        let (_, resp) = send(app.clone(), TestRequest::get("/?permission=livestock.read")).await;
        assert_eq!(resp["data"]["pagination"]["total"], 1);

        let (status, _) = send(app.clone(), TestRequest::delete(&format!("/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(app, TestRequest::get(&format!("/{}", id))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_permission_is_422() {
        let repos = MemoryStore::shared().repositories();
        let app = roles_routes().with_state(repos.roles.clone());
        let (status, resp) = send(
            app,
            TestRequest::post("/", json!({"name": "Root", "permissions": ["everything"]})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(resp["errors"][0]["field"], "permissions[0]");
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let repos = MemoryStore::shared().repositories();
        let app = roles_routes().with_state(repos.roles.clone());
        send(app.clone(), TestRequest::post("/", json!({"name": "Quản lý"}))).await;
        let (status, _) = send(app, TestRequest::post("/", json!({"name": "Quản lý"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_role_with_users_cannot_be_deleted() {
        let repos = MemoryStore::shared().repositories();
        let app = roles_routes().with_state(repos.roles.clone());
        let (_, created) = send(
            app.clone(),
            TestRequest::post("/", json!({"name": "Kế toán", "permissions": ["report.read"]})),
        )
        .await;
        let role_id: Uuid = id_of(&created).parse().unwrap();
        repos
            .users
            .create(
                UserRequest {
                    username: "ketoan01".into(),
                    email: "ketoan01@farm.local".into(),
                    full_name: "Trần Thị Mai".into(),
                    phone: None,
                    role_id,
                },
                None,
            )
            .await
            .unwrap();

        let (status, resp) = send(app, TestRequest::delete(&format!("/{}", role_id))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(resp["message"].as_str().unwrap().contains("1 user"));
    }

    #[tokio::test]
    async fn test_permission_catalogue() {
        let repos = MemoryStore::shared().repositories();
        let app = roles_routes().with_state(repos.roles.clone());
        let (status, resp) = send(app, TestRequest::get("/permissions")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["data"].as_array().unwrap().len(), PERMISSION_CATALOGUE.len());
    }
}
