//! Export batches: livestock sold off the farm
//!
//! Status flow `PENDING -> EXPORTING -> COMPLETED`. Only a `PENDING` batch
//! can be cancelled; once an animal is added it has left the farm. Each
//! exported animal carries a warranty used by insurance requests.
//!
//! - `POST|GET /api/v1/batch-exports`
//! - `GET|PUT|DELETE /api/v1/batch-exports/:id`
//! - `POST /api/v1/batch-exports/:id/livestock` - Export an animal
//! - `POST /api/v1/batch-exports/:id/complete`
//! - `POST /api/v1/batch-exports/:id/cancel`

pub mod models;
pub mod repository;
pub mod routes;

pub use models::{
    AddExportLivestockRequest, BatchExport, BatchExportDetail, BatchExportFilter,
    BatchExportRequest, BatchExportWithDetails,
};
pub use repository::{BatchExportRepository, PgBatchExportRepository};
pub use routes::batch_exports_routes;
