use chrono::{DateTime, Utc};
use farm_common::types::{InsuranceStatus, LivestockStatus};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::api::response::AppError;
use crate::db::{ensure_transition, DbError, DbResult};
use crate::features::batch_exports::BatchExportDetail;
use crate::features::shared::{PageRequest, Validator, MAX_TEXT_LENGTH};

const ENTITY: &str = "insurance request";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InsuranceRequest {
    pub id: Uuid,
    pub livestock_id: Uuid,
    pub batch_export_id: Uuid,
    pub disease_id: Option<Uuid>,
    pub reason: String,
    #[sqlx(try_from = "String")]
    pub status: InsuranceStatus,
    pub reject_reason: Option<String>,
    pub replacement_livestock_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

impl InsuranceRequest {
    pub fn transition(&mut self, to: InsuranceStatus, action: &'static str) -> DbResult<()> {
        ensure_transition(ENTITY, self.status, to, action)?;
        self.status = to;
        Ok(())
    }

    pub fn reject(&mut self, reason: &str) -> DbResult<()> {
        self.transition(InsuranceStatus::Rejected, "reject")?;
        self.reject_reason = Some(reason.trim().to_string());
        Ok(())
    }

    /// Close an approved claim with the animal shipped in replacement
    pub fn complete(&mut self, replacement: Uuid) -> DbResult<()> {
        if replacement == self.livestock_id {
            return Err(DbError::validation(
                "Replacement livestock must differ from the claimed livestock",
            ));
        }
        self.transition(InsuranceStatus::Completed, "complete")?;
        self.replacement_livestock_id = Some(replacement);
        Ok(())
    }
}

/// A claim is accepted only for an animal of the batch, inside its warranty
pub fn ensure_claimable(detail: &BatchExportDetail, now: DateTime<Utc>) -> DbResult<()> {
    if detail.under_warranty(now) {
        Ok(())
    } else {
        Err(DbError::validation(format!(
            "Livestock '{}' warranty expired on {}",
            detail.inspection_code,
            detail.warranty_until.format("%Y-%m-%d")
        )))
    }
}

/// Only healthy animals may be shipped as a replacement
pub fn ensure_replaceable(status: LivestockStatus) -> DbResult<()> {
    if status == LivestockStatus::Healthy {
        Ok(())
    } else {
        Err(DbError::invalid_state("livestock", status, "ship as replacement"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInsuranceRequest {
    pub livestock_id: Uuid,
    pub batch_export_id: Uuid,
    #[serde(default)]
    pub disease_id: Option<Uuid>,
    pub reason: String,
}

impl CreateInsuranceRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .name("reason", &self.reason, MAX_TEXT_LENGTH)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectInsuranceRequest {
    #[serde(default)]
    pub reason: String,
}

impl RejectInsuranceRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .name("reason", &self.reason, MAX_TEXT_LENGTH)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteInsuranceRequest {
    pub replacement_livestock_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsuranceFilter {
    pub status: Option<InsuranceStatus>,
    pub batch_export_id: Option<Uuid>,
    pub livestock_id: Option<Uuid>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl InsuranceFilter {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }

    pub fn matches(&self, req: &InsuranceRequest) -> bool {
        self.status.map_or(true, |s| s == req.status)
            && self.batch_export_id.map_or(true, |b| b == req.batch_export_id)
            && self.livestock_id.map_or(true, |l| l == req.livestock_id)
    }
}
