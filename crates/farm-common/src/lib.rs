//! Farm Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging and error handling for the farm back office.
//!
//! # Overview
//!
//! - **Error Handling**: [`FarmError`] and the [`Result`] alias
//! - **Logging**: tracing subscriber setup shared by the server and the CLI
//! - **Types**: status and category enums that travel over the wire, together
//!   with the status transition rules every aggregate is guarded by
//!
//! # Example
//!
//! ```
//! use farm_common::types::{BatchImportStatus, StatusFlow};
//!
//! assert!(BatchImportStatus::Pending.can_transition_to(BatchImportStatus::Cancelled));
//! assert!(!BatchImportStatus::Completed.can_transition_to(BatchImportStatus::Cancelled));
//! ```

pub mod error;
pub mod logging;
pub mod types;

pub use error::{FarmError, Result};
