//! Medicines and the diseases they treat or prevent
//!
//! - `POST|GET /api/v1/medicines`
//! - `GET|PUT|DELETE /api/v1/medicines/:id`
//!
//! `disease_ids` on update replaces the whole link set.

pub mod models;
pub mod repository;
pub mod routes;

pub use models::{Medicine, MedicineFilter, MedicineRequest};
pub use repository::{MedicineRepository, PgMedicineRepository};
pub use routes::medicines_routes;
