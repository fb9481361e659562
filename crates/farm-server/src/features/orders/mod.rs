//! Customer orders
//!
//! The total is always computed from the lines. Orders tied to a
//! procurement package require the package to be awarded.
//!
//! - `POST|GET /api/v1/orders`
//! - `GET /api/v1/orders/:id`
//! - `POST /api/v1/orders/:id/confirm`
//! - `POST /api/v1/orders/:id/complete`
//! - `POST /api/v1/orders/:id/cancel`

pub mod models;
pub mod repository;
pub mod routes;

pub use models::{Order, OrderFilter, OrderLine, OrderLineRequest, OrderRequest, OrderWithLines};
pub use repository::{OrderRepository, PgOrderRepository};
pub use routes::orders_routes;
