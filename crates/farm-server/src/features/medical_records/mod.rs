//! Disease records of individual animals
//!
//! Opening a record marks the animal `SICK`; recovering it restores
//! `HEALTHY` once no other treatment is running, and a fatal outcome marks
//! the animal `DEAD`.
//!
//! - `POST|GET /api/v1/medical-records`
//! - `GET /api/v1/medical-records/:id`
//! - `POST /api/v1/medical-records/:id/recover`
//! - `POST /api/v1/medical-records/:id/dead`

pub mod models;
pub mod repository;
pub mod routes;

pub use models::{MedicalRecord, MedicalRecordFilter, MedicalRecordRequest};
pub use repository::{MedicalRecordRepository, PgMedicalRecordRepository};
pub use routes::medical_records_routes;
