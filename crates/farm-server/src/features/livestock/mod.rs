//! Livestock inventory
//!
//! - `POST /api/v1/livestock` - Register an animal (code allocated when omitted)
//! - `GET /api/v1/livestock` - List with species/barn/status/keyword filters
//! - `GET /api/v1/livestock/summary` - Counts per status
//! - `GET /api/v1/livestock/code/:code` - Look up by inspection code
//! - `GET|PUT|DELETE /api/v1/livestock/:id`
//! - `PUT /api/v1/livestock/:id/status` - Guarded status change
//! - `GET /api/v1/livestock/:id/vaccinations` - Vaccination history

pub mod models;
pub mod repository;
pub mod routes;

pub use models::{
    ChangeStatusRequest, CreateLivestockRequest, Livestock, LivestockFilter, LivestockSummary,
    StatusCount, UpdateLivestockRequest, VaccinationHistoryEntry,
};
pub use repository::{LivestockRepository, PgLivestockRepository};
pub use routes::livestock_routes;
