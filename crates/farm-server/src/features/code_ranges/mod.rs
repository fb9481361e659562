//! Inspection code ranges
//!
//! Each species owns non-overlapping numeric ranges from which livestock
//! inspection codes are handed out in order. A code is the range's
//! `current_code` rendered zero-padded to the configured width.
//!
//! - `POST /api/v1/code-ranges`, `GET /api/v1/code-ranges?species_id=`
//! - `GET|DELETE /api/v1/code-ranges/:id` (delete only while unused)
//! - `POST /api/v1/code-ranges/allocate` - Take the next code of a species

pub mod models;
pub mod repository;
pub mod routes;

pub use models::{format_code, AllocateCodeRequest, AllocatedCode, CodeRange, CodeRangeFilter, CreateCodeRangeRequest};
pub use repository::{allocate_next_in, CodeRangeRepository, PgCodeRangeRepository};
pub use routes::code_ranges_routes;
