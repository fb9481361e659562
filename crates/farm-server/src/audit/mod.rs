//! Audit trail of write requests
//!
//! [`AuditLayer`] records every successful POST/PUT/PATCH/DELETE under
//! `/api/v1` to `audit_log`: action and resource inferred from the path,
//! the first UUID in the path as resource id, the JSON body as `changes`,
//! the `x-user-id` header, peer IP and user agent. Writes are spawned and
//! never delay or fail the request. Reads are not audited.
//!
//! - `GET /api/v1/audit` - List entries with filters

mod middleware;
mod models;
mod repository;
mod routes;

pub use middleware::AuditLayer;
pub use models::{AuditAction, AuditEntry, AuditFilter, CreateAuditEntry, ResourceType};
pub use repository::{AuditRepository, PgAuditRepository};
pub use routes::audit_routes;
