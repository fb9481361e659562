use std::sync::Arc;

use axum::{extract::State, routing::get, Router};

use super::models::{AuditEntry, AuditFilter};
use super::repository::AuditRepository;
use crate::api::extract::ApiQuery;
use crate::api::response::{ApiResponse, ApiResult};
use crate::features::shared::Paginated;

type Repo = Arc<dyn AuditRepository>;

pub fn audit_routes() -> Router<Repo> {
    Router::new().route("/", get(list_entries))
}

#[tracing::instrument(skip(repo))]
async fn list_entries(
    State(repo): State<Repo>,
    ApiQuery(filter): ApiQuery<AuditFilter>,
) -> ApiResult<ApiResponse<Paginated<AuditEntry>>> {
    Ok(ApiResponse::ok(repo.list(filter).await?))
}
