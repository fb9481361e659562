use chrono::{DateTime, Utc};
use farm_common::types::SpeciesType;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::api::response::AppError;
use crate::features::shared::{PageRequest, Validator, MAX_NAME_LENGTH, MAX_TEXT_LENGTH};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Species {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub species_type: SpeciesType,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

/// Body of create and update requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSpeciesRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub species_type: SpeciesType,
}

pub type UpdateSpeciesRequest = CreateSpeciesRequest;

impl CreateSpeciesRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .name("name", &self.name, MAX_NAME_LENGTH)
            .text("description", self.description.as_deref(), MAX_TEXT_LENGTH)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeciesFilter {
    pub name: Option<String>,
    pub species_type: Option<SpeciesType>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl SpeciesFilter {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }

    /// In-memory counterpart of the SQL WHERE clause
    pub fn matches(&self, species: &Species) -> bool {
        let name_ok = self.name.as_deref().map_or(true, |needle| {
            species.name.to_lowercase().contains(&needle.to_lowercase())
        });
        let type_ok = self.species_type.map_or(true, |t| t == species.species_type);
        name_ok && type_ok
    }
}
