use chrono::{DateTime, Utc};
use farm_common::types::VaccinationStatus;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::api::response::AppError;
use crate::db::{ensure_transition, DbError, DbResult};
use crate::features::shared::{PageRequest, Validator, MAX_NAME_LENGTH, MAX_TEXT_LENGTH};

const ENTITY: &str = "batch vaccination";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BatchVaccination {
    pub id: Uuid,
    pub name: String,
    pub medicine_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub conductor: Option<String>,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: VaccinationStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

impl BatchVaccination {
    pub fn ensure_editable(&self) -> DbResult<()> {
        if self.status == VaccinationStatus::Scheduled {
            Ok(())
        } else {
            Err(DbError::invalid_state(ENTITY, self.status, "update"))
        }
    }

    /// The first vaccinated animal starts the campaign
    pub fn register_livestock(&mut self) -> DbResult<()> {
        if !self.status.accepts_livestock() {
            return Err(DbError::invalid_state(ENTITY, self.status, "add livestock to"));
        }
        if self.status == VaccinationStatus::Scheduled {
            self.status = VaccinationStatus::InProgress;
        }
        Ok(())
    }

    pub fn transition(
        &mut self,
        to: VaccinationStatus,
        action: &'static str,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        ensure_transition(ENTITY, self.status, to, action)?;
        self.status = to;
        if to == VaccinationStatus::Completed {
            self.completed_at = Some(now);
        }
        Ok(())
    }

    pub fn ensure_deletable(&self) -> DbResult<()> {
        if matches!(self.status, VaccinationStatus::Scheduled | VaccinationStatus::Cancelled) {
            Ok(())
        } else {
            Err(DbError::invalid_state(ENTITY, self.status, "delete"))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VaccinationDetail {
    pub id: Uuid,
    pub batch_vaccination_id: Uuid,
    pub livestock_id: Uuid,
    pub inspection_code: String,
    pub vaccinated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchVaccinationWithDetails {
    #[serde(flatten)]
    pub batch: BatchVaccination,
    pub details: Vec<VaccinationDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaccinationRequest {
    pub name: String,
    pub medicine_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub conductor: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl VaccinationRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .name("name", &self.name, MAX_NAME_LENGTH)
            .text("conductor", self.conductor.as_deref(), MAX_NAME_LENGTH)
            .text("description", self.description.as_deref(), MAX_TEXT_LENGTH)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AddVaccinatedLivestockRequest {
    pub livestock_id: Uuid,
    /// Defaults to now
    #[serde(default)]
    pub vaccinated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaccinationFilter {
    pub status: Option<VaccinationStatus>,
    pub medicine_id: Option<Uuid>,
    /// Inclusive bounds on `scheduled_at`
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl VaccinationFilter {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }

    pub fn matches(&self, batch: &BatchVaccination) -> bool {
        self.status.map_or(true, |s| s == batch.status)
            && self.medicine_id.map_or(true, |m| m == batch.medicine_id)
            && self.from.map_or(true, |from| batch.scheduled_at >= from)
            && self.to.map_or(true, |to| batch.scheduled_at <= to)
    }
}
