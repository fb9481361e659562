//! Species catalogue
//!
//! - `POST /api/v1/species` - Create a species
//! - `GET /api/v1/species` - List species (name and type filters, paging)
//! - `GET /api/v1/species/:id` - Get a species
//! - `PUT /api/v1/species/:id` - Update a species
//! - `DELETE /api/v1/species/:id` - Delete a species no livestock refers to

pub mod models;
pub mod repository;
pub mod routes;

pub use models::{CreateSpeciesRequest, Species, SpeciesFilter, UpdateSpeciesRequest};
pub use repository::{PgSpeciesRepository, SpeciesRepository};
pub use routes::species_routes;
