use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::api::response::AppError;
use crate::features::shared::{PageRequest, Validator};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CodeRange {
    pub id: Uuid,
    pub species_id: Uuid,
    pub start_code: i64,
    pub end_code: i64,
    /// Next code to hand out; `end_code + 1` once exhausted
    pub current_code: i64,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

impl CodeRange {
    /// Inclusive ranges `[start, end]` overlap
    pub fn overlaps(&self, start: i64, end: i64) -> bool {
        start <= self.end_code && self.start_code <= end
    }

    pub fn is_used(&self) -> bool {
        self.current_code != self.start_code
    }

    pub fn has_available(&self) -> bool {
        self.current_code <= self.end_code
    }

    pub fn remaining(&self) -> i64 {
        (self.end_code - self.current_code + 1).max(0)
    }
}

pub fn format_code(value: i64, width: usize) -> String {
    format!("{:0width$}", value, width = width)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCodeRangeRequest {
    pub species_id: Uuid,
    pub start_code: i64,
    pub end_code: i64,
}

impl CreateCodeRangeRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .non_negative("start_code", self.start_code)
            .check(
                self.start_code <= self.end_code,
                "end_code",
                "end_code must not be less than start_code",
            )
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocateCodeRequest {
    pub species_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedCode {
    pub species_id: Uuid,
    pub range_id: Uuid,
    pub code: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeRangeFilter {
    pub species_id: Option<Uuid>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl CodeRangeFilter {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }

    pub fn matches(&self, range: &CodeRange) -> bool {
        self.species_id.map_or(true, |id| id == range.species_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: i64, end: i64, current: i64) -> CodeRange {
        let now = Utc::now();
        CodeRange {
            id: Uuid::new_v4(),
            species_id: Uuid::new_v4(),
            start_code: start,
            end_code: end,
            current_code: current,
            created_at: now,
            created_by: None,
            updated_at: now,
            updated_by: None,
        }
    }

    #[test]
    fn test_overlap_is_inclusive() {
        let r = range(100, 199, 100);
        assert!(r.overlaps(199, 300));
        assert!(r.overlaps(0, 100));
        assert!(r.overlaps(120, 130));
        assert!(r.overlaps(0, 1000));
        assert!(!r.overlaps(200, 300));
        assert!(!r.overlaps(0, 99));
    }

    #[test]
    fn test_availability() {
        assert!(range(1, 1, 1).has_available());
        assert!(!range(1, 1, 2).has_available());
        assert_eq!(range(1, 10, 4).remaining(), 7);
        assert_eq!(range(1, 10, 11).remaining(), 0);
        assert!(!range(5, 9, 5).is_used());
        assert!(range(5, 9, 6).is_used());
    }

    #[test]
    fn test_format_code_pads() {
        assert_eq!(format_code(42, 6), "000042");
        assert_eq!(format_code(1234567, 6), "1234567");
        assert_eq!(format_code(0, 3), "000");
    }

    #[test]
    fn test_validate_order() {
        let req = CreateCodeRangeRequest {
            species_id: Uuid::new_v4(),
            start_code: 10,
            end_code: 9,
        };
        assert!(req.validate().is_err());

        let req = CreateCodeRangeRequest {
            species_id: Uuid::new_v4(),
            start_code: 10,
            end_code: 10,
        };
        assert!(req.validate().is_ok());
    }
}
