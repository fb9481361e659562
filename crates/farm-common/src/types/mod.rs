//! Wire-level enums shared by the server and the CLI
//!
//! Every enum is stored as `TEXT` in the database and serialized in
//! `SCREAMING_SNAKE_CASE` on the wire. Status enums also implement
//! [`StatusFlow`], the transition table guarding their aggregate.

#[macro_use]
mod macros;

mod status;

pub use status::*;

text_enum! {
    /// Broad classification of a species
    pub enum SpeciesType("species type") {
        Cattle => "CATTLE",
        Pig => "PIG",
        Poultry => "POULTRY",
        Goat => "GOAT",
        Other => "OTHER",
    }
}

text_enum! {
    pub enum Gender("gender") {
        Male => "MALE",
        Female => "FEMALE",
    }
}

text_enum! {
    pub enum DiseaseType("disease type") {
        Infectious => "INFECTIOUS",
        NonInfectious => "NON_INFECTIOUS",
        Parasitic => "PARASITIC",
    }
}

text_enum! {
    pub enum MedicineType("medicine type") {
        Vaccine => "VACCINE",
        Treatment => "TREATMENT",
        Prophylactic => "PROPHYLACTIC",
    }
}

/// Permissions a role may grant
pub const PERMISSION_CATALOGUE: &[&str] = &[
    "livestock.read",
    "livestock.write",
    "batch.read",
    "batch.write",
    "medical.read",
    "medical.write",
    "procurement.read",
    "procurement.write",
    "insurance.read",
    "insurance.write",
    "user.manage",
    "report.read",
];

pub fn is_known_permission(permission: &str) -> bool {
    PERMISSION_CATALOGUE.contains(&permission)
}
