use chrono::{DateTime, Duration, NaiveDate, Utc};
use farm_common::types::{BatchExportStatus, LivestockStatus};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::api::response::AppError;
use crate::db::{ensure_transition, DbError, DbResult};
use crate::features::shared::{PageRequest, Validator, MAX_NAME_LENGTH, MAX_TEXT_LENGTH};

const ENTITY: &str = "batch export";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BatchExport {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    pub total_livestock: i32,
    pub exported_quantity: i32,
    pub export_date: NaiveDate,
    pub warranty_days: i32,
    pub completed_at: Option<DateTime<Utc>>,
    #[sqlx(try_from = "String")]
    pub status: BatchExportStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

impl BatchExport {
    pub fn ensure_editable(&self) -> DbResult<()> {
        if self.status == BatchExportStatus::Pending {
            Ok(())
        } else {
            Err(DbError::invalid_state(ENTITY, self.status, "update"))
        }
    }

    pub fn warranty_until(&self, exported_at: DateTime<Utc>) -> DateTime<Utc> {
        exported_at + Duration::days(i64::from(self.warranty_days))
    }

    /// Count one more animal out, starting or completing the export
    pub fn register_livestock(&mut self, now: DateTime<Utc>) -> DbResult<()> {
        if !self.status.accepts_livestock() {
            return Err(DbError::invalid_state(ENTITY, self.status, "add livestock to"));
        }
        if self.exported_quantity >= self.total_livestock {
            return Err(DbError::conflict(format!(
                "Batch export is full ({}/{})",
                self.exported_quantity, self.total_livestock
            )));
        }

        self.exported_quantity += 1;
        if self.status == BatchExportStatus::Pending {
            self.status = BatchExportStatus::Exporting;
        }
        if self.exported_quantity == self.total_livestock {
            self.status = BatchExportStatus::Completed;
            self.completed_at = Some(now);
        }
        Ok(())
    }

    pub fn transition(
        &mut self,
        to: BatchExportStatus,
        action: &'static str,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        ensure_transition(ENTITY, self.status, to, action)?;
        self.status = to;
        if to == BatchExportStatus::Completed {
            self.completed_at = Some(now);
        }
        Ok(())
    }

    pub fn ensure_deletable(&self) -> DbResult<()> {
        if !matches!(self.status, BatchExportStatus::Pending | BatchExportStatus::Cancelled) {
            return Err(DbError::invalid_state(ENTITY, self.status, "delete"));
        }
        if self.exported_quantity > 0 {
            return Err(DbError::conflict("Batch export still has livestock"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BatchExportDetail {
    pub id: Uuid,
    pub batch_export_id: Uuid,
    pub livestock_id: Uuid,
    pub inspection_code: String,
    #[sqlx(try_from = "String")]
    pub livestock_status: LivestockStatus,
    pub exported_at: DateTime<Utc>,
    pub warranty_until: DateTime<Utc>,
    pub unit_price: f64,
}

impl BatchExportDetail {
    /// Covered through the whole last day of the warranty
    pub fn under_warranty(&self, at: DateTime<Utc>) -> bool {
        at.date_naive() <= self.warranty_until.date_naive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchExportWithDetails {
    #[serde(flatten)]
    pub batch: BatchExport,
    pub details: Vec<BatchExportDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchExportRequest {
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub customer_address: Option<String>,
    pub total_livestock: i32,
    pub export_date: NaiveDate,
    /// Falls back to the configured default
    #[serde(default)]
    pub warranty_days: Option<i32>,
}

impl BatchExportRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.name("customer_name", &self.customer_name, MAX_NAME_LENGTH)
            .text("customer_phone", self.customer_phone.as_deref(), 32)
            .text("customer_address", self.customer_address.as_deref(), MAX_TEXT_LENGTH)
            .positive("total_livestock", self.total_livestock);
        if let Some(days) = self.warranty_days {
            v.non_negative("warranty_days", days);
        }
        v.finish()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AddExportLivestockRequest {
    pub livestock_id: Uuid,
    #[serde(default)]
    pub unit_price: f64,
}

impl AddExportLivestockRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .non_negative("unit_price", self.unit_price)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchExportFilter {
    pub status: Option<BatchExportStatus>,
    /// Matches customer name or phone
    pub keyword: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl BatchExportFilter {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }

    pub fn matches(&self, batch: &BatchExport) -> bool {
        let keyword_ok = self.keyword.as_deref().map_or(true, |kw| {
            let kw = kw.to_lowercase();
            batch.customer_name.to_lowercase().contains(&kw)
                || batch
                    .customer_phone
                    .as_deref()
                    .is_some_and(|p| p.contains(&kw))
        });
        self.status.map_or(true, |s| s == batch.status) && keyword_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(total: i32) -> BatchExport {
        let now = Utc::now();
        BatchExport {
            id: Uuid::new_v4(),
            customer_name: "Công ty Vissan".into(),
            customer_phone: Some("0909123456".into()),
            customer_address: None,
            total_livestock: total,
            exported_quantity: 0,
            export_date: now.date_naive(),
            warranty_days: 30,
            completed_at: None,
            status: BatchExportStatus::Pending,
            created_at: now,
            created_by: None,
            updated_at: now,
            updated_by: None,
        }
    }

    #[test]
    fn test_warranty_window() {
        let b = batch(1);
        let now = Utc::now();
        let until = b.warranty_until(now);
        assert_eq!(until - now, Duration::days(30));
    }

    #[test]
    fn test_export_progress() {
        let mut b = batch(2);
        b.register_livestock(Utc::now()).unwrap();
        assert_eq!(b.status, BatchExportStatus::Exporting);
        b.register_livestock(Utc::now()).unwrap();
        assert_eq!(b.status, BatchExportStatus::Completed);
        assert!(b.register_livestock(Utc::now()).is_err());
    }

    #[test]
    fn test_cancel_only_while_pending() {
        let mut b = batch(3);
        b.register_livestock(Utc::now()).unwrap();
        let err = b
            .transition(BatchExportStatus::Cancelled, "cancel", Utc::now())
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot cancel batch export in status EXPORTING");
    }

    #[test]
    fn test_negative_warranty_rejected() {
        let req = BatchExportRequest {
            customer_name: "Khách lẻ".into(),
            customer_phone: None,
            customer_address: None,
            total_livestock: 1,
            export_date: Utc::now().date_naive(),
            warranty_days: Some(-1),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_keyword_matches_phone() {
        let filter = BatchExportFilter {
            keyword: Some("0909".into()),
            ..Default::default()
        };
        assert!(filter.matches(&batch(1)));
    }
}
