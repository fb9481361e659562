//! Shared utilities for feature modules

pub mod pagination;
#[cfg(test)]
pub mod test_helpers;
pub mod validation;

pub use pagination::{PageRequest, Paginated, PaginationMetadata};
pub use validation::{normalize, Validator, MAX_NAME_LENGTH, MAX_TEXT_LENGTH};
