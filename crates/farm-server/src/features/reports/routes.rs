use std::sync::Arc;

use axum::{extract::State, routing::get, Router};

use super::models::{Dashboard, SpeciesSummary};
use super::repository::ReportRepository;
use crate::api::response::{ApiResponse, ApiResult};

type Repo = Arc<dyn ReportRepository>;

pub fn reports_routes() -> Router<Repo> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/livestock-by-species", get(livestock_by_species))
}

#[tracing::instrument(skip(repo))]
async fn dashboard(State(repo): State<Repo>) -> ApiResult<ApiResponse<Dashboard>> {
    Ok(ApiResponse::ok(repo.dashboard().await?))
}

#[tracing::instrument(skip(repo))]
async fn livestock_by_species(
    State(repo): State<Repo>,
) -> ApiResult<ApiResponse<Vec<SpeciesSummary>>> {
    Ok(ApiResponse::ok(repo.livestock_by_species().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::Repositories;
    use crate::features::batch_imports::BatchImportRequest;
    use crate::features::livestock::CreateLivestockRequest;
    use crate::features::shared::test_helpers::{send, TestRequest};
    use crate::features::species::CreateSpeciesRequest;
    use axum::http::StatusCode;
    use farm_common::types::{Gender, LivestockStatus, SpeciesType};
    use uuid::Uuid;

    async fn species(repos: &Repositories, name: &str, species_type: SpeciesType) -> Uuid {
        repos
            .species
            .create(
                CreateSpeciesRequest {
                    name: name.into(),
                    description: None,
                    species_type,
                },
                None,
            )
            .await
            .unwrap()
            .id
    }

    async fn animal(repos: &Repositories, species_id: Uuid, code: &str) -> Uuid {
        repos
            .livestock
            .create(
                CreateLivestockRequest {
                    inspection_code: Some(code.into()),
                    species_id,
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

    #[tokio::test]
    async fn test_empty_dashboard_is_zero_filled() {
        let repos = MemoryStore::shared().repositories();
        let app = reports_routes().with_state(repos.reports.clone());
        let (status, resp) = send(app, TestRequest::get("/dashboard")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["data"]["livestock"]["total"], 0);
        assert_eq!(resp["data"]["batch_imports_by_status"].as_array().unwrap().len(), 4);
        assert_eq!(resp["data"]["open_insurance_requests"], 0);
    }

    #[tokio::test]
    async fn test_dashboard_counts() {
        let repos = MemoryStore::shared().repositories();
        let pig = species(&repos, "Heo", SpeciesType::Pig).await;
        species(&repos, "Gà", SpeciesType::Poultry).await;
        animal(&repos, pig, "HEO-1").await;
        let sick = animal(&repos, pig, "HEO-2").await;
        repos
            .livestock
            .change_status(sick, LivestockStatus::Sick, None)
            .await
            .unwrap();
        repos
            .batch_imports
            .create(
                BatchImportRequest {
                    name: "Nhập heo giống".into(),
                    supplier: "Trại giống Đồng Nai".into(),
                    barn_id: None,
                    expected_quantity: 10,
                    expected_import_date: chrono::NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                },
                None,
            )
            .await
            .unwrap();

        let app = reports_routes().with_state(repos.reports.clone());
        let (_, resp) = send(app.clone(), TestRequest::get("/dashboard")).await;
        let data = &resp["data"];
        assert_eq!(data["livestock"]["total"], 2);
        assert_eq!(data["batch_imports_by_status"][0]["status"], "PENDING");
        assert_eq!(data["batch_imports_by_status"][0]["count"], 1);

        let by_species = data["livestock_by_species"].as_array().unwrap();
        assert_eq!(by_species.len(), 2);
        let heo = by_species.iter().find(|s| s["species_name"] == "Heo").unwrap();
        assert_eq!(heo["count"], 2);

        let (_, resp) = send(app, TestRequest::get("/livestock-by-species")).await;
        let heo = resp["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["species_name"] == "Heo")
            .unwrap()
            .clone();
        let sick_count = heo["by_status"]
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["status"] == "SICK")
            .unwrap()["count"]
            .clone();
        assert_eq!(sick_count, 1);
    }
}
