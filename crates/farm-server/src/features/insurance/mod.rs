//! Warranty claims on exported livestock
//!
//! A claim names an animal and the export batch it left with. It can only
//! be filed while the animal's warranty runs, and an animal has at most one
//! open (`NEW` or `APPROVED`) claim. Completing an approved claim ships a
//! healthy replacement animal.
//!
//! - `POST|GET /api/v1/insurance-requests`
//! - `GET /api/v1/insurance-requests/:id`
//! - `POST /api/v1/insurance-requests/:id/approve`
//! - `POST /api/v1/insurance-requests/:id/reject`
//! - `POST /api/v1/insurance-requests/:id/cancel`
//! - `POST /api/v1/insurance-requests/:id/complete`

pub mod models;
pub mod repository;
pub mod routes;

pub use models::{
    CompleteInsuranceRequest, CreateInsuranceRequest, InsuranceFilter, InsuranceRequest,
    RejectInsuranceRequest,
};
pub use repository::{InsuranceRepository, PgInsuranceRepository};
pub use routes::insurance_routes;
