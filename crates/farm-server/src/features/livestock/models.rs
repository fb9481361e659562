use chrono::{DateTime, NaiveDate, Utc};
use farm_common::types::{Gender, LivestockStatus};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::api::response::AppError;
use crate::features::shared::{PageRequest, Validator, MAX_NAME_LENGTH, MAX_TEXT_LENGTH};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Livestock {
    pub id: Uuid,
    pub inspection_code: String,
    pub species_id: Uuid,
    pub barn_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub status: LivestockStatus,
    #[sqlx(try_from = "String")]
    pub gender: Gender,
    pub color: Option<String>,
    pub weight_kg: f64,
    pub date_of_birth: Option<NaiveDate>,
    pub origin: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLivestockRequest {
    /// Allocated from the species' code ranges when omitted
    #[serde(default)]
    pub inspection_code: Option<String>,
    pub species_id: Uuid,
    #[serde(default)]
    pub barn_id: Option<Uuid>,
    pub gender: Gender,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub weight_kg: f64,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub origin: Option<String>,
    /// Defaults to HEALTHY
    #[serde(default)]
    pub status: Option<LivestockStatus>,
}

impl CreateLivestockRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        if let Some(code) = &self.inspection_code {
            v.name("inspection_code", code, MAX_NAME_LENGTH);
        }
        v.non_negative("weight_kg", self.weight_kg)
            .check(self.weight_kg.is_finite(), "weight_kg", "weight_kg must be a number")
            .text("color", self.color.as_deref(), MAX_NAME_LENGTH)
            .text("origin", self.origin.as_deref(), MAX_TEXT_LENGTH)
            .check(
                self.status.map_or(true, LivestockStatus::is_on_farm),
                "status",
                "New livestock cannot start EXPORTED or DEAD",
            )
            .check(
                self.date_of_birth.map_or(true, |d| d <= Utc::now().date_naive()),
                "date_of_birth",
                "date_of_birth cannot be in the future",
            )
            .finish()
    }

    pub fn initial_status(&self) -> LivestockStatus {
        self.status.unwrap_or(LivestockStatus::Healthy)
    }
}

/// Descriptive fields; the whole set is replaced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateLivestockRequest {
    #[serde(default)]
    pub barn_id: Option<Uuid>,
    #[serde(default)]
    pub color: Option<String>,
    pub weight_kg: f64,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub origin: Option<String>,
}

impl UpdateLivestockRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .non_negative("weight_kg", self.weight_kg)
            .check(self.weight_kg.is_finite(), "weight_kg", "weight_kg must be a number")
            .text("color", self.color.as_deref(), MAX_NAME_LENGTH)
            .text("origin", self.origin.as_deref(), MAX_TEXT_LENGTH)
            .check(
                self.date_of_birth.map_or(true, |d| d <= Utc::now().date_naive()),
                "date_of_birth",
                "date_of_birth cannot be in the future",
            )
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: LivestockStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LivestockFilter {
    pub species_id: Option<Uuid>,
    pub barn_id: Option<Uuid>,
    pub status: Option<LivestockStatus>,
    /// Matches inspection code, color or origin
    pub keyword: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl LivestockFilter {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }

    pub fn matches(&self, animal: &Livestock) -> bool {
        let keyword_ok = self.keyword.as_deref().map_or(true, |kw| {
            let kw = kw.to_lowercase();
            let hit = |field: Option<&str>| field.map_or(false, |f| f.to_lowercase().contains(&kw));
            hit(Some(animal.inspection_code.as_str())) || hit(animal.color.as_deref()) || hit(animal.origin.as_deref())
        });
        self.species_id.map_or(true, |id| id == animal.species_id)
            && self.barn_id.map_or(true, |id| Some(id) == animal.barn_id)
            && self.status.map_or(true, |s| s == animal.status)
            && keyword_ok
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VaccinationHistoryEntry {
    pub batch_vaccination_id: Uuid,
    pub batch_name: String,
    pub medicine_id: Uuid,
    pub medicine_name: String,
    pub vaccinated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: LivestockStatus,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivestockSummary {
    pub total: i64,
    pub by_status: Vec<StatusCount>,
}

impl LivestockSummary {
    /// Build from sparse `(status, count)` rows; missing statuses count 0
    pub fn from_counts(counts: impl IntoIterator<Item = (LivestockStatus, i64)>) -> Self {
        let counts: Vec<_> = counts.into_iter().collect();
        let by_status: Vec<StatusCount> = LivestockStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                count: counts
                    .iter()
                    .filter(|(s, _)| s == status)
                    .map(|(_, c)| *c)
                    .sum(),
            })
            .collect();
        Self {
            total: by_status.iter().map(|s| s.count).sum(),
            by_status,
        }
    }

    pub fn count(&self, status: LivestockStatus) -> i64 {
        self.by_status
            .iter()
            .find(|s| s.status == status)
            .map_or(0, |s| s.count)
    }
}
