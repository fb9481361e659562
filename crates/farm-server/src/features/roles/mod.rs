//! Roles and their permission sets
//!
//! Permissions are drawn from [`farm_common::types::PERMISSION_CATALOGUE`].
//!
//! - `POST|GET /api/v1/roles`
//! - `GET /api/v1/roles/permissions` - The permission catalogue
//! - `GET|PUT|DELETE /api/v1/roles/:id`

pub mod models;
pub mod repository;
pub mod routes;

pub use models::{Role, RoleFilter, RoleRequest};
pub use repository::{PgRoleRepository, RoleRepository};
pub use routes::roles_routes;
