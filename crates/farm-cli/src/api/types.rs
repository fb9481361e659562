//! API request and response types
//!
//! Mirrors the server's wire format. Only the fields the CLI shows are
//! declared; unknown fields are ignored.

use chrono::{DateTime, NaiveDate, Utc};
use farm_common::types::{
    BatchExportStatus, BatchImportStatus, DiseaseType, Gender, LivestockStatus, SpeciesType,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Response envelope shared by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<ErrorDetail>>,
    #[serde(default)]
    pub message: String,
}

impl<T> ApiResponse<T> {
    /// Envelope message followed by any field-level errors
    pub fn failure_message(&self) -> String {
        let fields: Vec<String> = self
            .errors
            .iter()
            .flatten()
            .filter_map(|e| e.field.as_ref().map(|f| format!("{}: {}", f, e.message)))
            .collect();
        if fields.is_empty() {
            self.message.clone()
        } else {
            format!("{} ({})", self.message, fields.join("; "))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub field: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

/// Paging shared by list commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub database: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub species_type: SpeciesType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSpeciesRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub species_type: SpeciesType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Livestock {
    pub id: Uuid,
    pub inspection_code: String,
    pub species_id: Uuid,
    pub barn_id: Option<Uuid>,
    pub status: LivestockStatus,
    pub gender: Gender,
    pub color: Option<String>,
    pub weight_kg: f64,
    pub date_of_birth: Option<NaiveDate>,
    pub origin: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LivestockQuery {
    pub species_id: Option<Uuid>,
    pub barn_id: Option<Uuid>,
    pub status: Option<LivestockStatus>,
    pub keyword: Option<String>,
    pub page: PageQuery,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: LivestockStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: LivestockStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivestockSummary {
    pub total: i64,
    pub by_status: Vec<StatusCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchImport {
    pub id: Uuid,
    pub name: String,
    pub supplier: String,
    pub barn_id: Option<Uuid>,
    pub expected_quantity: i32,
    pub imported_quantity: i32,
    pub expected_import_date: NaiveDate,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: BatchImportStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchExport {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub total_livestock: i32,
    pub exported_quantity: i32,
    pub export_date: NaiveDate,
    pub warranty_days: i32,
    pub status: BatchExportStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disease {
    pub id: Uuid,
    pub name: String,
    pub symptom: Option<String>,
    pub description: Option<String>,
    pub disease_type: DiseaseType,
}

/// Count keyed by a status name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tally {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesCount {
    pub species_id: Uuid,
    pub species_name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub livestock: LivestockSummary,
    pub livestock_by_species: Vec<SpeciesCount>,
    pub batch_imports_by_status: Vec<Tally>,
    pub batch_exports_by_status: Vec<Tally>,
    pub open_insurance_requests: i64,
    pub active_vaccinations: i64,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_message_lists_fields() {
        let envelope: ApiResponse<Species> = serde_json::from_value(serde_json::json!({
            "statusCode": 422,
            "success": false,
            "data": null,
            "errors": [
                {"code": "VALIDATION_ERROR", "message": "must not be empty", "field": "name"},
                {"code": "VALIDATION_ERROR", "message": "unexpected"}
            ],
            "message": "Validation failed"
        }))
        .unwrap();

        assert!(envelope.data.is_none());
        assert_eq!(envelope.failure_message(), "Validation failed (name: must not be empty)");
    }

    #[test]
    fn test_livestock_ignores_audit_columns() {
        let animal: Livestock = serde_json::from_value(serde_json::json!({
            "id": "6f1c1f8e-2b7a-4d4e-9a43-0d7b1f6e5a10",
            "inspection_code": "000042",
            "species_id": "0b8d3c55-7f0e-4d55-8d7e-3c1f2a9b6e21",
            "barn_id": null,
            "status": "QUARANTINED",
            "gender": "FEMALE",
            "color": "Đen",
            "weight_kg": 92.5,
            "date_of_birth": "2025-11-02",
            "origin": null,
            "created_at": "2026-01-10T08:00:00Z",
            "created_by": null
        }))
        .unwrap();

        assert_eq!(animal.status, LivestockStatus::Quarantined);
        assert_eq!(animal.date_of_birth, NaiveDate::from_ymd_opt(2025, 11, 2));
    }
}
