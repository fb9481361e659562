//! Read-only aggregates for the back-office dashboard
//!
//! - `GET /api/v1/reports/dashboard`
//! - `GET /api/v1/reports/livestock-by-species`

pub mod models;
pub mod repository;
pub mod routes;

pub use models::{Dashboard, SpeciesCount, SpeciesStatusRow, SpeciesSummary, Tally};
pub use repository::{PgReportRepository, ReportRepository};
pub use routes::reports_routes;
