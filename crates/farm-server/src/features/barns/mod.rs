//! Barns housing livestock
//!
//! - `POST /api/v1/barns`, `GET /api/v1/barns` (name filter, paging)
//! - `GET|PUT|DELETE /api/v1/barns/:id`

pub mod models;
pub mod repository;
pub mod routes;

pub use models::{Barn, BarnFilter, BarnRequest};
pub use repository::{BarnRepository, PgBarnRepository};
pub use routes::barns_routes;
