//! Disease catalogue
//!
//! - `POST|GET /api/v1/diseases`
//! - `GET|PUT|DELETE /api/v1/diseases/:id`

pub mod models;
pub mod repository;
pub mod routes;

pub use models::{Disease, DiseaseFilter, DiseaseRequest};
pub use repository::{DiseaseRepository, PgDiseaseRepository};
pub use routes::diseases_routes;
