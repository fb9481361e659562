//! Back-office user accounts
//!
//! - `POST|GET /api/v1/users`
//! - `GET|PUT|DELETE /api/v1/users/:id`
//! - `POST /api/v1/users/:id/activate`
//! - `POST /api/v1/users/:id/deactivate`

pub mod models;
pub mod repository;
pub mod routes;

pub use models::{User, UserFilter, UserRequest};
pub use repository::{PgUserRepository, UserRepository};
pub use routes::users_routes;
