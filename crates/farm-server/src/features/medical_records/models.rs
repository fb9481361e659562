use chrono::{DateTime, Utc};
use farm_common::types::{LivestockStatus, MedicalRecordStatus, StatusFlow};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::api::response::AppError;
use crate::db::{ensure_transition, DbResult};
use crate::features::shared::{PageRequest, Validator, MAX_TEXT_LENGTH};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MedicalRecord {
    pub id: Uuid,
    pub livestock_id: Uuid,
    pub disease_id: Uuid,
    pub medicine_id: Option<Uuid>,
    pub diagnosed_at: DateTime<Utc>,
    pub treatment: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: MedicalRecordStatus,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

impl MedicalRecord {
    /// End the treatment with `outcome`
    pub fn close(
        &mut self,
        outcome: MedicalRecordStatus,
        action: &'static str,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        ensure_transition("medical record", self.status, outcome, action)?;
        self.status = outcome;
        self.closed_at = Some(now);
        Ok(())
    }
}

/// Livestock status to apply when a record opens, if any
pub fn status_on_diagnosis(current: LivestockStatus) -> Option<LivestockStatus> {
    current
        .can_transition_to(LivestockStatus::Sick)
        .then_some(LivestockStatus::Sick)
}

/// Livestock status to apply once the last open treatment recovers
pub fn status_on_recovery(current: LivestockStatus) -> Option<LivestockStatus> {
    current
        .can_transition_to(LivestockStatus::Healthy)
        .then_some(LivestockStatus::Healthy)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecordRequest {
    pub livestock_id: Uuid,
    pub disease_id: Uuid,
    #[serde(default)]
    pub medicine_id: Option<Uuid>,
    /// Defaults to now
    #[serde(default)]
    pub diagnosed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub treatment: Option<String>,
}

impl MedicalRecordRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .text("treatment", self.treatment.as_deref(), MAX_TEXT_LENGTH)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicalRecordFilter {
    pub livestock_id: Option<Uuid>,
    pub disease_id: Option<Uuid>,
    pub status: Option<MedicalRecordStatus>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl MedicalRecordFilter {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }

    pub fn matches(&self, record: &MedicalRecord) -> bool {
        self.livestock_id.map_or(true, |id| id == record.livestock_id)
            && self.disease_id.map_or(true, |id| id == record.disease_id)
            && self.status.map_or(true, |s| s == record.status)
    }
}
