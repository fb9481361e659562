use chrono::{DateTime, Utc};
use farm_common::types::ProcurementStatus;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::api::response::AppError;
use crate::db::{ensure_transition, DbError, DbResult};
use crate::features::shared::{PageRequest, Validator, MAX_NAME_LENGTH, MAX_TEXT_LENGTH};

const ENTITY: &str = "procurement package";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProcurementPackage {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub owner: String,
    pub expired_at: DateTime<Utc>,
    #[sqlx(try_from = "String")]
    pub status: ProcurementStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

impl ProcurementPackage {
    /// Status as reported to clients at `now`
    pub fn effective_status(&self, now: DateTime<Utc>) -> ProcurementStatus {
        if self.status == ProcurementStatus::Open && self.expired_at < now {
            ProcurementStatus::Expired
        } else {
            self.status
        }
    }

    /// Replace the stored status with the effective one
    pub fn resolve_expiry(mut self, now: DateTime<Utc>) -> Self {
        self.status = self.effective_status(now);
        self
    }

    pub fn transition(
        &mut self,
        to: ProcurementStatus,
        action: &'static str,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        ensure_transition(ENTITY, self.effective_status(now), to, action)?;
        self.status = to;
        Ok(())
    }

    pub fn ensure_editable(&self, now: DateTime<Utc>) -> DbResult<()> {
        match self.effective_status(now) {
            ProcurementStatus::Open => Ok(()),
            other => Err(DbError::invalid_state(ENTITY, other, "update")),
        }
    }

    pub fn ensure_deletable(&self, now: DateTime<Utc>) -> DbResult<()> {
        match self.effective_status(now) {
            ProcurementStatus::Open | ProcurementStatus::Cancelled => Ok(()),
            other => Err(DbError::invalid_state(ENTITY, other, "delete")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProcurementDetail {
    pub id: Uuid,
    pub procurement_package_id: Uuid,
    pub species_id: Uuid,
    pub required_quantity: i32,
    pub min_weight_kg: f64,
    pub max_weight_kg: f64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcurementWithDetails {
    #[serde(flatten)]
    pub package: ProcurementPackage,
    pub details: Vec<ProcurementDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcurementDetailRequest {
    pub species_id: Uuid,
    pub required_quantity: i32,
    pub min_weight_kg: f64,
    pub max_weight_kg: f64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcurementRequest {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner: String,
    pub expired_at: DateTime<Utc>,
    pub details: Vec<ProcurementDetailRequest>,
}

impl ProcurementRequest {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.name("code", &self.code, 50)
            .name("name", &self.name, MAX_NAME_LENGTH)
            .name("owner", &self.owner, MAX_NAME_LENGTH)
            .text("description", self.description.as_deref(), MAX_TEXT_LENGTH)
            .check(self.expired_at > now, "expired_at", "expired_at must be in the future")
            .check(!self.details.is_empty(), "details", "at least one detail is required");

        for (i, detail) in self.details.iter().enumerate() {
            let field = format!("details[{}]", i);
            v.check(
                detail.required_quantity > 0,
                &field,
                "required_quantity must be greater than 0",
            )
            .check(
                detail.min_weight_kg >= 0.0,
                &field,
                "min_weight_kg must not be negative",
            )
            .check(
                detail.min_weight_kg <= detail.max_weight_kg,
                &field,
                "min_weight_kg must not exceed max_weight_kg",
            );
        }
        v.finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcurementFilter {
    /// Compared against the effective status
    pub status: Option<ProcurementStatus>,
    /// Matches code, name or owner
    pub keyword: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl ProcurementFilter {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }

    pub fn matches(&self, package: &ProcurementPackage, now: DateTime<Utc>) -> bool {
        let keyword_ok = self.keyword.as_deref().map_or(true, |kw| {
            let kw = kw.to_lowercase();
            [&package.code, &package.name, &package.owner]
                .iter()
                .any(|text| text.to_lowercase().contains(&kw))
        });
        keyword_ok
            && self
                .status
                .map_or(true, |s| s == package.effective_status(now))
    }
}
