use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::api::response::AppError;
use crate::features::shared::{PageRequest, Validator, MAX_NAME_LENGTH, MAX_TEXT_LENGTH};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Barn {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub owner: String,
    pub capacity: i32,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

/// Create and update body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarnRequest {
    pub name: String,
    pub address: String,
    pub owner: String,
    pub capacity: i32,
}

impl BarnRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .name("name", &self.name, MAX_NAME_LENGTH)
            .name("address", &self.address, MAX_TEXT_LENGTH)
            .name("owner", &self.owner, MAX_NAME_LENGTH)
            .non_negative("capacity", self.capacity)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BarnFilter {
    pub name: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl BarnFilter {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }

    pub fn matches(&self, barn: &Barn) -> bool {
        self.name.as_deref().map_or(true, |needle| {
            barn.name.to_lowercase().contains(&needle.to_lowercase())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_capacity_rejected() {
        let req = BarnRequest {
            name: "Chuồng A".into(),
            address: "Lô 3".into(),
            owner: "Trại 1".into(),
            capacity: -1,
        };
        match req.validate() {
            Err(AppError::Validation(errors)) => {
                assert_eq!(errors[0].field.as_deref(), Some("capacity"))
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_zero_capacity_allowed() {
        let req = BarnRequest {
            name: "Chuồng B".into(),
            address: "Lô 4".into(),
            owner: "Trại 1".into(),
            capacity: 0,
        };
        assert!(req.validate().is_ok());
    }
}
