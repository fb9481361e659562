use chrono::{DateTime, Utc};
use farm_common::types::DiseaseType;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::api::response::AppError;
use crate::features::shared::{PageRequest, Validator, MAX_NAME_LENGTH, MAX_TEXT_LENGTH};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Disease {
    pub id: Uuid,
    pub name: String,
    pub symptom: Option<String>,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub disease_type: DiseaseType,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseaseRequest {
    pub name: String,
    #[serde(default)]
    pub symptom: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub disease_type: DiseaseType,
}

impl DiseaseRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .name("name", &self.name, MAX_NAME_LENGTH)
            .text("symptom", self.symptom.as_deref(), MAX_TEXT_LENGTH)
            .text("description", self.description.as_deref(), MAX_TEXT_LENGTH)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiseaseFilter {
    pub name: Option<String>,
    pub disease_type: Option<DiseaseType>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl DiseaseFilter {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }

    pub fn matches(&self, disease: &Disease) -> bool {
        let name_ok = self.name.as_deref().map_or(true, |needle| {
            disease.name.to_lowercase().contains(&needle.to_lowercase())
        });
        name_ok && self.disease_type.map_or(true, |t| t == disease.disease_type)
    }
}
