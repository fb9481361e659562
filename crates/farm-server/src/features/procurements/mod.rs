//! Procurement packages: tenders the farm bids on
//!
//! Status flow `OPEN -> AWARDED -> CLOSED`; an open package may also be
//! cancelled. A package still `OPEN` after `expired_at` reads as `EXPIRED`
//! and can no longer be awarded.
//!
//! - `POST|GET /api/v1/procurements`
//! - `GET|PUT|DELETE /api/v1/procurements/:id`
//! - `POST /api/v1/procurements/:id/award`
//! - `POST /api/v1/procurements/:id/close`
//! - `POST /api/v1/procurements/:id/cancel`

pub mod models;
pub mod repository;
pub mod routes;

pub use models::{
    ProcurementDetail, ProcurementDetailRequest, ProcurementFilter, ProcurementPackage,
    ProcurementRequest, ProcurementWithDetails,
};
pub use repository::{PgProcurementRepository, ProcurementRepository};
pub use routes::procurements_routes;
