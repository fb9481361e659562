//! API client module
//!
//! Typed access to the farm back office HTTP API.

pub mod client;
pub mod endpoints;
pub mod types;

pub use client::ApiClient;
pub use types::*;
