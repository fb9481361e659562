//! Farm Back Office Server Library
//!
//! REST API for a livestock farm: species and barns, inspection code ranges,
//! the livestock register, import/export batches, vaccination campaigns,
//! medical records, procurement packages, orders, warranty claims, users and
//! roles, dashboard reports and an audit trail.
//!
//! # Architecture
//!
//! - [`features`]: one vertical slice per aggregate (models, repository, routes)
//! - [`db`]: pool set-up, [`db::DbError`], the [`db::Repositories`] bundle and
//!   the in-memory store used by tests
//! - [`api`]: the response envelope, extractors and router assembly
//! - [`audit`]: write-request audit layer and `GET /api/v1/audit`
//! - [`middleware`]: CORS, tracing, rate limiting and the acting user
//!
//! Every response uses the envelope
//! `{ statusCode, success, data, errors, message }`.
//!
//! # Example
//!
//! ```no_run
//! use farm_server::{api, config::Config, db};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let pool = db::create_pool(&db::DbConfig::from(&config.database)).await?;
//!     let repos = db::Repositories::postgres(pool.clone(), &config.farm);
//!     api::serve(config, repos, Some(pool)).await
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod audit;
pub mod config;
pub mod db;
pub mod features;
pub mod middleware;

pub use api::response::{ApiResponse, ApiResult, AppError};
pub use db::{DbError, DbResult, Repositories};
