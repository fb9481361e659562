//! Feature modules of the farm back office API
//!
//! Each feature is a vertical slice:
//! - `models.rs` - Row types, request DTOs with validation, list filters
//! - `repository.rs` - The aggregate's repository trait and its PostgreSQL implementation
//! - `routes.rs` - HTTP handlers and the feature router
//!
//! Routers are typed over their own repository (`Router<Arc<dyn XRepository>>`)
//! and receive it from [`Repositories`] when mounted.

pub mod barns;
pub mod batch_exports;
pub mod batch_imports;
pub mod code_ranges;
pub mod diseases;
pub mod insurance;
pub mod livestock;
pub mod medical_records;
pub mod medicines;
pub mod orders;
pub mod procurements;
pub mod reports;
pub mod roles;
pub mod shared;
pub mod species;
pub mod users;
pub mod vaccinations;

use axum::Router;

use crate::audit;
use crate::db::Repositories;

/// Mount every feature under its path prefix
pub fn router(repos: &Repositories) -> Router<()> {
    Router::new()
        .nest("/species", species::species_routes().with_state(repos.species.clone()))
        .nest("/barns", barns::barns_routes().with_state(repos.barns.clone()))
        .nest(
            "/code-ranges",
            code_ranges::code_ranges_routes().with_state(repos.code_ranges.clone()),
        )
        .nest("/livestock", livestock::livestock_routes().with_state(repos.livestock.clone()))
        .nest(
            "/batch-imports",
            batch_imports::batch_imports_routes().with_state(repos.batch_imports.clone()),
        )
        .nest(
            "/batch-exports",
            batch_exports::batch_exports_routes().with_state(repos.batch_exports.clone()),
        )
        .nest("/diseases", diseases::diseases_routes().with_state(repos.diseases.clone()))
        .nest("/medicines", medicines::medicines_routes().with_state(repos.medicines.clone()))
        .nest(
            "/batch-vaccinations",
            vaccinations::vaccinations_routes().with_state(repos.vaccinations.clone()),
        )
        .nest(
            "/medical-records",
            medical_records::medical_records_routes().with_state(repos.medical_records.clone()),
        )
        .nest(
            "/procurements",
            procurements::procurements_routes().with_state(repos.procurements.clone()),
        )
        .nest("/orders", orders::orders_routes().with_state(repos.orders.clone()))
        .nest(
            "/insurance-requests",
            insurance::insurance_routes().with_state(repos.insurance.clone()),
        )
        .nest("/roles", roles::roles_routes().with_state(repos.roles.clone()))
        .nest("/users", users::users_routes().with_state(repos.users.clone()))
        .nest("/reports", reports::reports_routes().with_state(repos.reports.clone()))
        .nest("/audit", audit::audit_routes().with_state(repos.audit.clone()))
}
