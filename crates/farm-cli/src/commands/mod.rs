//! CLI command implementations
//!
//! Each subcommand group has its own module; every command takes the shared
//! [`ApiClient`](crate::api::ApiClient).

pub mod dashboard;
pub mod diseases;
pub mod exports;
pub mod health;
pub mod imports;
pub mod livestock;
pub mod species;
