use chrono::{DateTime, Utc};
use farm_common::types::MedicineType;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::api::response::AppError;
use crate::features::shared::{PageRequest, Validator, MAX_NAME_LENGTH, MAX_TEXT_LENGTH};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Medicine {
    pub id: Uuid,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub medicine_type: MedicineType,
    pub description: Option<String>,
    pub disease_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

impl Medicine {
    pub fn is_vaccine(&self) -> bool {
        self.medicine_type == MedicineType::Vaccine
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicineRequest {
    pub name: String,
    pub medicine_type: MedicineType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub disease_ids: Vec<Uuid>,
}

impl MedicineRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .name("name", &self.name, MAX_NAME_LENGTH)
            .text("description", self.description.as_deref(), MAX_TEXT_LENGTH)
            .finish()
    }

    /// Link set without repeats, in request order
    pub fn unique_disease_ids(&self) -> Vec<Uuid> {
        let mut ids = Vec::with_capacity(self.disease_ids.len());
        for id in &self.disease_ids {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicineFilter {
    pub name: Option<String>,
    pub medicine_type: Option<MedicineType>,
    pub disease_id: Option<Uuid>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl MedicineFilter {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }

    pub fn matches(&self, medicine: &Medicine) -> bool {
        let name_ok = self.name.as_deref().map_or(true, |needle| {
            medicine.name.to_lowercase().contains(&needle.to_lowercase())
        });
        name_ok
            && self.medicine_type.map_or(true, |t| t == medicine.medicine_type)
            && self
                .disease_id
                .map_or(true, |d| medicine.disease_ids.contains(&d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_disease_ids_keeps_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let req = MedicineRequest {
            name: "Oxytetracycline".into(),
            medicine_type: MedicineType::Treatment,
            description: None,
            disease_ids: vec![a, b, a],
        };
        assert_eq!(req.unique_disease_ids(), vec![a, b]);
    }
}
