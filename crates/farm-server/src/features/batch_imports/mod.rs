//! Import batches: livestock arriving at the farm
//!
//! Status flow `PENDING -> IMPORTING -> COMPLETED`, with `CANCELLED`
//! reachable from `PENDING` and `IMPORTING`. Adding the first animal starts
//! the import; reaching the expected quantity completes it.
//!
//! - `POST|GET /api/v1/batch-imports`
//! - `GET|PUT|DELETE /api/v1/batch-imports/:id`
//! - `POST /api/v1/batch-imports/:id/livestock` - Add an animal
//! - `DELETE /api/v1/batch-imports/:id/livestock/:livestock_id` - Remove an animal
//! - `POST /api/v1/batch-imports/:id/complete`
//! - `POST /api/v1/batch-imports/:id/cancel`

pub mod models;
pub mod repository;
pub mod routes;

pub use models::{
    AddImportLivestockRequest, BatchImport, BatchImportDetail, BatchImportFilter,
    BatchImportRequest, BatchImportWithDetails,
};
pub use repository::{BatchImportRepository, PgBatchImportRepository};
pub use routes::batch_imports_routes;
