//! Shared validation utilities
//!
//! Request DTOs collect every problem into a [`Validator`] and turn it into
//! a single [`AppError::Validation`] so clients see all failing fields at
//! once.
//!
//! ```rust,ignore
//! let mut v = Validator::new();
//! v.name("name", &req.name, 200);
//! v.non_negative("capacity", req.capacity);
//! v.finish()?;
//! ```

use crate::api::response::{AppError, ErrorDetail};

/// Default maximum length for names and codes
pub const MAX_NAME_LENGTH: usize = 200;

/// Default maximum length for free text
pub const MAX_TEXT_LENGTH: usize = 2000;

#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ErrorDetail>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error unless `ok` holds
    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.errors.push(ErrorDetail::field(field, message));
        }
        self
    }

    /// Required, trimmed, bounded text
    pub fn name(&mut self, field: &str, value: &str, max_length: usize) -> &mut Self {
        if value.trim().is_empty() {
            self.errors
                .push(ErrorDetail::field(field, format!("{} is required", field)));
        } else if value.chars().count() > max_length {
            self.errors.push(ErrorDetail::field(
                field,
                format!("{} must be at most {} characters", field, max_length),
            ));
        }
        self
    }

    /// Optional bounded text
    pub fn text(&mut self, field: &str, value: Option<&str>, max_length: usize) -> &mut Self {
        if let Some(value) = value {
            self.check(
                value.chars().count() <= max_length,
                field,
                format!("{} must be at most {} characters", field, max_length),
            );
        }
        self
    }

    pub fn positive<N: PartialOrd + Default>(&mut self, field: &str, value: N) -> &mut Self {
        self.check(value > N::default(), field, format!("{} must be greater than 0", field))
    }

    pub fn non_negative<N: PartialOrd + Default>(&mut self, field: &str, value: N) -> &mut Self {
        self.check(value >= N::default(), field, format!("{} must not be negative", field))
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        let trimmed = value.trim();
        let ok = match trimmed.split_once('@') {
            Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
            None => false,
        };
        self.check(ok, field, format!("{} must be a valid email address", field))
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ErrorDetail] {
        &self.errors
    }

    pub fn finish(&mut self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

/// Trim an optional string, mapping blank input to `None`
pub fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_all_errors() {
        let mut v = Validator::new();
        v.name("name", "  ", 10)
            .positive("quantity", 0)
            .non_negative("weight_kg", -1.5);

        assert_eq!(v.errors().len(), 3);
        let fields: Vec<_> = v.errors().iter().filter_map(|e| e.field.clone()).collect();
        assert_eq!(fields, vec!["name", "quantity", "weight_kg"]);

        match v.finish() {
            Err(AppError::Validation(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_name_length_counts_chars() {
        let mut v = Validator::new();
        v.name("name", "Bò vàng", 7);
        assert!(v.is_valid());
        v.name("name", "Bò vàng!", 7);
        assert!(!v.is_valid());
    }

    #[test]
    fn test_email() {
        let mut v = Validator::new();
        v.email("email", "vet@farm.local");
        assert!(v.is_valid());
        v.email("email", "farm.local").email("email", "@farm");
        assert_eq!(v.errors().len(), 2);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Some("  x ".into())), Some("x".to_string()));
        assert_eq!(normalize(Some("   ".into())), None);
        assert_eq!(normalize(None), None);
    }
}
