//! Vaccination campaigns
//!
//! A campaign applies one vaccine to a set of animals. Status flow
//! `SCHEDULED -> IN_PROGRESS -> COMPLETED`, cancellable until completed.
//!
//! - `POST|GET /api/v1/batch-vaccinations`
//! - `GET|PUT|DELETE /api/v1/batch-vaccinations/:id`
//! - `POST /api/v1/batch-vaccinations/:id/livestock` - Record a vaccinated animal
//! - `POST /api/v1/batch-vaccinations/:id/complete`
//! - `POST /api/v1/batch-vaccinations/:id/cancel`

pub mod models;
pub mod repository;
pub mod routes;

pub use models::{
    AddVaccinatedLivestockRequest, BatchVaccination, BatchVaccinationWithDetails,
    VaccinationDetail, VaccinationFilter, VaccinationRequest,
};
pub use repository::{PgVaccinationRepository, VaccinationRepository};
pub use routes::vaccinations_routes;
