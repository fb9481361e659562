use chrono::{DateTime, NaiveDate, Utc};
use farm_common::types::{BatchImportStatus, LivestockStatus};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::api::response::AppError;
use crate::db::{ensure_transition, DbError, DbResult};
use crate::features::shared::{PageRequest, Validator, MAX_NAME_LENGTH};

const ENTITY: &str = "batch import";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BatchImport {
    pub id: Uuid,
    pub name: String,
    pub supplier: String,
    pub barn_id: Option<Uuid>,
    pub expected_quantity: i32,
    pub imported_quantity: i32,
    pub expected_import_date: NaiveDate,
    pub completed_at: Option<DateTime<Utc>>,
    #[sqlx(try_from = "String")]
    pub status: BatchImportStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

impl BatchImport {
    pub fn ensure_editable(&self) -> DbResult<()> {
        if self.status == BatchImportStatus::Pending {
            Ok(())
        } else {
            Err(DbError::invalid_state(ENTITY, self.status, "update"))
        }
    }

    /// Count one more animal in, starting or completing the import
    pub fn register_livestock(&mut self, now: DateTime<Utc>) -> DbResult<()> {
        if !self.status.accepts_livestock() {
            return Err(DbError::invalid_state(ENTITY, self.status, "add livestock to"));
        }
        if self.imported_quantity >= self.expected_quantity {
            return Err(DbError::conflict(format!(
                "Batch import is full ({}/{})",
                self.imported_quantity, self.expected_quantity
            )));
        }

        self.imported_quantity += 1;
        if self.status == BatchImportStatus::Pending {
            self.status = BatchImportStatus::Importing;
        }
        if self.imported_quantity == self.expected_quantity {
            self.status = BatchImportStatus::Completed;
            self.completed_at = Some(now);
        }
        Ok(())
    }

    pub fn unregister_livestock(&mut self) -> DbResult<()> {
        if self.status != BatchImportStatus::Importing {
            return Err(DbError::invalid_state(ENTITY, self.status, "remove livestock from"));
        }
        if self.imported_quantity == 0 {
            return Err(DbError::conflict("Batch import has no livestock to remove"));
        }
        self.imported_quantity -= 1;
        Ok(())
    }

    pub fn transition(
        &mut self,
        to: BatchImportStatus,
        action: &'static str,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        ensure_transition(ENTITY, self.status, to, action)?;
        self.status = to;
        if to == BatchImportStatus::Completed {
            self.completed_at = Some(now);
        }
        Ok(())
    }

    pub fn ensure_deletable(&self) -> DbResult<()> {
        if !matches!(self.status, BatchImportStatus::Pending | BatchImportStatus::Cancelled) {
            return Err(DbError::invalid_state(ENTITY, self.status, "delete"));
        }
        if self.imported_quantity > 0 {
            return Err(DbError::conflict("Batch import still has livestock"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BatchImportDetail {
    pub id: Uuid,
    pub batch_import_id: Uuid,
    pub livestock_id: Uuid,
    pub inspection_code: String,
    #[sqlx(try_from = "String")]
    pub livestock_status: LivestockStatus,
    pub imported_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchImportWithDetails {
    #[serde(flatten)]
    pub batch: BatchImport,
    pub details: Vec<BatchImportDetail>,
}

/// Create and update body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchImportRequest {
    pub name: String,
    pub supplier: String,
    #[serde(default)]
    pub barn_id: Option<Uuid>,
    pub expected_quantity: i32,
    pub expected_import_date: NaiveDate,
}

impl BatchImportRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .name("name", &self.name, MAX_NAME_LENGTH)
            .name("supplier", &self.supplier, MAX_NAME_LENGTH)
            .positive("expected_quantity", self.expected_quantity)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AddImportLivestockRequest {
    pub livestock_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchImportFilter {
    pub status: Option<BatchImportStatus>,
    /// Matches name or supplier
    pub keyword: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl BatchImportFilter {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }

    pub fn matches(&self, batch: &BatchImport) -> bool {
        let keyword_ok = self.keyword.as_deref().map_or(true, |kw| {
            let kw = kw.to_lowercase();
            batch.name.to_lowercase().contains(&kw) || batch.supplier.to_lowercase().contains(&kw)
        });
        self.status.map_or(true, |s| s == batch.status) && keyword_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(expected: i32) -> BatchImport {
        let now = Utc::now();
        BatchImport {
            id: Uuid::new_v4(),
            name: "Lô nhập 01".into(),
            supplier: "HTX Ba Vì".into(),
            barn_id: None,
            expected_quantity: expected,
            imported_quantity: 0,
            expected_import_date: now.date_naive(),
            completed_at: None,
            status: BatchImportStatus::Pending,
            created_at: now,
            created_by: None,
            updated_at: now,
            updated_by: None,
        }
    }

    #[test]
    fn test_first_animal_starts_import() {
        let mut b = batch(3);
        b.register_livestock(Utc::now()).unwrap();
        assert_eq!(b.status, BatchImportStatus::Importing);
        assert_eq!(b.imported_quantity, 1);
        assert!(b.completed_at.is_none());
    }

    #[test]
    fn test_reaching_expected_completes() {
        let mut b = batch(2);
        b.register_livestock(Utc::now()).unwrap();
        b.register_livestock(Utc::now()).unwrap();
        assert_eq!(b.status, BatchImportStatus::Completed);
        assert!(b.completed_at.is_some());

        let err = b.register_livestock(Utc::now()).unwrap_err();
        assert!(matches!(err, DbError::InvalidState { .. }));
    }

    #[test]
    fn test_remove_only_while_importing() {
        let mut b = batch(5);
        assert!(b.unregister_livestock().is_err());
        b.register_livestock(Utc::now()).unwrap();
        b.unregister_livestock().unwrap();
        assert_eq!(b.imported_quantity, 0);
        assert_eq!(b.status, BatchImportStatus::Importing);
    }

    #[test]
    fn test_complete_requires_importing() {
        let mut b = batch(5);
        assert!(b
            .transition(BatchImportStatus::Completed, "complete", Utc::now())
            .is_err());
        b.register_livestock(Utc::now()).unwrap();
        b.transition(BatchImportStatus::Completed, "complete", Utc::now())
            .unwrap();
        assert!(b.completed_at.is_some());
    }

    #[test]
    fn test_delete_rules() {
        let mut b = batch(5);
        assert!(b.ensure_deletable().is_ok());
        b.register_livestock(Utc::now()).unwrap();
        assert!(b.ensure_deletable().is_err());
        b.transition(BatchImportStatus::Cancelled, "cancel", Utc::now())
            .unwrap();
        // cancelled but still holding an animal
        assert!(b.ensure_deletable().is_err());
    }

    #[test]
    fn test_validate_quantity() {
        let req = BatchImportRequest {
            name: "Lô 2".into(),
            supplier: "NCC".into(),
            barn_id: None,
            expected_quantity: 0,
            expected_import_date: Utc::now().date_naive(),
        };
        assert!(req.validate().is_err());
    }
}
