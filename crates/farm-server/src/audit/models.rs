//! Audit data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::features::shared::PageRequest;

/// Audit log entry from the database
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEntry {
    pub id: Uuid,
    /// Acting user, `None` for anonymous requests
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<Uuid>,
    /// Request body of the write
    pub changes: Option<JsonValue>,
    /// Method, URI and response status
    pub metadata: Option<JsonValue>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Audit action types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    AddLivestock,
    RemoveLivestock,
    ChangeStatus,
    Complete,
    Cancel,
    Confirm,
    Approve,
    Reject,
    Award,
    Close,
    Recover,
    MarkDead,
    Activate,
    Deactivate,
    Allocate,
    Other,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::AddLivestock => "add_livestock",
            Self::RemoveLivestock => "remove_livestock",
            Self::ChangeStatus => "change_status",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
            Self::Confirm => "confirm",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Award => "award",
            Self::Close => "close",
            Self::Recover => "recover",
            Self::MarkDead => "mark_dead",
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
            Self::Allocate => "allocate",
            Self::Other => "other",
        }
    }

    /// Action named by the last path segment of an action endpoint
    pub fn from_suffix(segment: &str) -> Option<Self> {
        Some(match segment {
            "livestock" => Self::AddLivestock,
            "status" => Self::ChangeStatus,
            "complete" => Self::Complete,
            "cancel" => Self::Cancel,
            "confirm" => Self::Confirm,
            "approve" => Self::Approve,
            "reject" => Self::Reject,
            "award" => Self::Award,
            "close" => Self::Close,
            "recover" => Self::Recover,
            "dead" => Self::MarkDead,
            "activate" => Self::Activate,
            "deactivate" => Self::Deactivate,
            "allocate" => Self::Allocate,
            _ => return None,
        })
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resource types that can be audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Species,
    Barn,
    CodeRange,
    Livestock,
    BatchImport,
    BatchExport,
    Disease,
    Medicine,
    BatchVaccination,
    MedicalRecord,
    Procurement,
    Order,
    InsuranceRequest,
    Role,
    User,
    Other,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Species => "species",
            Self::Barn => "barn",
            Self::CodeRange => "code_range",
            Self::Livestock => "livestock",
            Self::BatchImport => "batch_import",
            Self::BatchExport => "batch_export",
            Self::Disease => "disease",
            Self::Medicine => "medicine",
            Self::BatchVaccination => "batch_vaccination",
            Self::MedicalRecord => "medical_record",
            Self::Procurement => "procurement",
            Self::Order => "order",
            Self::InsuranceRequest => "insurance_request",
            Self::Role => "role",
            Self::User => "user",
            Self::Other => "other",
        }
    }

    /// Resource mounted at `/api/v1/<segment>`
    pub fn from_segment(segment: &str) -> Self {
        match segment {
            "species" => Self::Species,
            "barns" => Self::Barn,
            "code-ranges" => Self::CodeRange,
            "livestock" => Self::Livestock,
            "batch-imports" => Self::BatchImport,
            "batch-exports" => Self::BatchExport,
            "diseases" => Self::Disease,
            "medicines" => Self::Medicine,
            "batch-vaccinations" => Self::BatchVaccination,
            "medical-records" => Self::MedicalRecord,
            "procurements" => Self::Procurement,
            "orders" => Self::Order,
            "insurance-requests" => Self::InsuranceRequest,
            "roles" => Self::Role,
            "users" => Self::User,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for creating an audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditEntry {
    pub user_id: Option<Uuid>,
    pub action: AuditAction,
    pub resource_type: ResourceType,
    pub resource_id: Option<Uuid>,
    pub changes: Option<JsonValue>,
    pub metadata: Option<JsonValue>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Query parameters of `GET /audit`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditFilter {
    pub user_id: Option<Uuid>,
    pub action: Option<AuditAction>,
    pub resource_type: Option<ResourceType>,
    pub resource_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl AuditFilter {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }

    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.user_id.map_or(true, |u| entry.user_id == Some(u))
            && self.action.map_or(true, |a| entry.action == a.as_str())
            && self
                .resource_type
                .map_or(true, |r| entry.resource_type == r.as_str())
            && self.resource_id.map_or(true, |r| entry.resource_id == Some(r))
            && self.from.map_or(true, |from| entry.timestamp >= from)
            && self.to.map_or(true, |to| entry.timestamp <= to)
    }
}
