//! Database access layer
//!
//! Connection pool set-up, the repository error type, and [`Repositories`],
//! the bundle of one repository per aggregate that the routers are built on.
//! PostgreSQL implementations live beside each feature. The `memory` module,
//! compiled for tests and the `test-util` feature only, holds an in-process
//! store implementing the same traits.

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use farm_common::types::StatusFlow;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::PgConnection;
use thiserror::Error;

use crate::audit::{AuditRepository, PgAuditRepository};
use crate::config::{DatabaseConfig, FarmConfig};
use crate::features::{
    barns::{BarnRepository, PgBarnRepository},
    batch_exports::{BatchExportRepository, PgBatchExportRepository},
    batch_imports::{BatchImportRepository, PgBatchImportRepository},
    code_ranges::{CodeRangeRepository, PgCodeRangeRepository},
    diseases::{DiseaseRepository, PgDiseaseRepository},
    insurance::{InsuranceRepository, PgInsuranceRepository},
    livestock::{LivestockRepository, PgLivestockRepository},
    medical_records::{MedicalRecordRepository, PgMedicalRecordRepository},
    medicines::{MedicineRepository, PgMedicineRepository},
    orders::{OrderRepository, PgOrderRepository},
    procurements::{PgProcurementRepository, ProcurementRepository},
    reports::{PgReportRepository, ReportRepository},
    roles::{PgRoleRepository, RoleRepository},
    species::{PgSpeciesRepository, SpeciesRepository},
    users::{PgUserRepository, UserRepository},
    vaccinations::{PgVaccinationRepository, VaccinationRepository},
};

/// Repository operation errors with contextual information
#[derive(Error, Debug)]
pub enum DbError {
    /// SQL query or connection error
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Requested record does not exist
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// Record already exists (unique constraint violation)
    #[error("{entity} '{key}' already exists")]
    Duplicate { entity: &'static str, key: String },

    /// Write would break a reference or a business rule
    #[error("{0}")]
    Conflict(String),

    /// Status guard rejected the operation
    #[error("Cannot {action} {entity} in status {from}")]
    InvalidState {
        entity: &'static str,
        from: String,
        action: &'static str,
    },

    /// Request is well-formed but refers to unusable data
    #[error("{0}")]
    Validation(String),
}

impl DbError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn duplicate(entity: &'static str, key: impl ToString) -> Self {
        Self::Duplicate {
            entity,
            key: key.to_string(),
        }
    }

    pub fn invalid_state(entity: &'static str, from: impl ToString, action: &'static str) -> Self {
        Self::InvalidState {
            entity,
            from: from.to_string(),
            action,
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Guard a status change with the status' transition table
pub fn ensure_transition<S: StatusFlow>(
    entity: &'static str,
    from: S,
    to: S,
    action: &'static str,
) -> DbResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(DbError::invalid_state(entity, from, action))
    }
}

/// Reject a request body that refers to a missing row
///
/// `table` must be a trusted identifier; it is interpolated into the SQL.
pub async fn ensure_reference(
    conn: &mut PgConnection,
    table: &'static str,
    entity: &'static str,
    id: uuid::Uuid,
) -> DbResult<()> {
    let exists: bool = sqlx::query_scalar(&format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
        table
    ))
    .bind(id)
    .fetch_one(conn)
    .await?;

    if exists {
        Ok(())
    } else {
        Err(missing_reference(entity, id))
    }
}

pub fn missing_reference(entity: &'static str, id: impl std::fmt::Display) -> DbError {
    DbError::validation(format!("{} '{}' does not exist", entity, id))
}

/// Re-label a lookup miss on a body reference as a bad request
pub fn as_reference(err: DbError) -> DbError {
    match err {
        DbError::NotFound { entity, id } => missing_reference(entity, id),
        other => other,
    }
}

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

/// `%text%` for ILIKE, with the text's own wildcards matched literally
pub fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Translate constraint violations into repository errors
///
/// `entity` and `key` describe the row being written and are used for the
/// duplicate message.
pub fn classify(err: sqlx::Error, entity: &'static str, key: impl ToString) -> DbError {
    if let sqlx::Error::Database(ref db_err) = err {
        match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => return DbError::duplicate(entity, key),
            Some(FOREIGN_KEY_VIOLATION) => {
                let constraint = db_err.constraint().unwrap_or("foreign key");
                return DbError::conflict(format!(
                    "{} is referenced by or refers to other records ({})",
                    entity, constraint
                ));
            },
            Some(CHECK_VIOLATION) => {
                let constraint = db_err.constraint().unwrap_or("check");
                return DbError::validation(format!(
                    "{} violates constraint {}",
                    entity, constraint
                ));
            },
            _ => {},
        }
    }
    DbError::Sqlx(err)
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: Option<u64>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: crate::config::DEFAULT_DATABASE_URL.to_string(),
            max_connections: crate::config::DEFAULT_DATABASE_MAX_CONNECTIONS,
            min_connections: crate::config::DEFAULT_DATABASE_MIN_CONNECTIONS,
            connect_timeout_secs: crate::config::DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            idle_timeout_secs: Some(crate::config::DEFAULT_DATABASE_IDLE_TIMEOUT_SECS),
        }
    }
}

impl From<&DatabaseConfig> for DbConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: Some(config.idle_timeout_secs),
        }
    }
}

impl DbConfig {
    /// Read pool settings from `DATABASE_URL` and `DB_*` variables
    pub fn from_env() -> DbResult<Self> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| DbError::validation("DATABASE_URL not set"))?;

        let defaults = Self::default();
        let parse = |key: &str| std::env::var(key).ok().and_then(|s| s.parse().ok());

        Ok(Self {
            url,
            max_connections: parse("DB_MAX_CONNECTIONS").unwrap_or(defaults.max_connections),
            min_connections: parse("DB_MIN_CONNECTIONS").unwrap_or(defaults.min_connections),
            connect_timeout_secs: std::env::var("DB_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.connect_timeout_secs),
            idle_timeout_secs: std::env::var("DB_IDLE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(defaults.idle_timeout_secs),
        })
    }
}

pub async fn create_pool(config: &DbConfig) -> DbResult<PgPool> {
    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs));

    if let Some(idle_timeout) = config.idle_timeout_secs {
        options = options.idle_timeout(Duration::from_secs(idle_timeout));
    }

    let pool = options.connect(&config.url).await?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> DbResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(DbError::from)
}

/// One repository per aggregate
#[derive(Clone)]
pub struct Repositories {
    pub species: Arc<dyn SpeciesRepository>,
    pub barns: Arc<dyn BarnRepository>,
    pub code_ranges: Arc<dyn CodeRangeRepository>,
    pub livestock: Arc<dyn LivestockRepository>,
    pub batch_imports: Arc<dyn BatchImportRepository>,
    pub batch_exports: Arc<dyn BatchExportRepository>,
    pub diseases: Arc<dyn DiseaseRepository>,
    pub medicines: Arc<dyn MedicineRepository>,
    pub vaccinations: Arc<dyn VaccinationRepository>,
    pub medical_records: Arc<dyn MedicalRecordRepository>,
    pub procurements: Arc<dyn ProcurementRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub insurance: Arc<dyn InsuranceRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub users: Arc<dyn UserRepository>,
    pub reports: Arc<dyn ReportRepository>,
    pub audit: Arc<dyn AuditRepository>,
}

impl Repositories {
    /// Wire the PostgreSQL implementations onto one shared pool
    pub fn postgres(pool: PgPool, farm: &FarmConfig) -> Self {
        Self {
            species: Arc::new(PgSpeciesRepository::new(pool.clone())),
            barns: Arc::new(PgBarnRepository::new(pool.clone())),
            code_ranges: Arc::new(PgCodeRangeRepository::new(
                pool.clone(),
                farm.inspection_code_width,
            )),
            livestock: Arc::new(PgLivestockRepository::new(
                pool.clone(),
                farm.inspection_code_width,
            )),
            batch_imports: Arc::new(PgBatchImportRepository::new(pool.clone())),
            batch_exports: Arc::new(PgBatchExportRepository::new(
                pool.clone(),
                farm.default_warranty_days,
            )),
            diseases: Arc::new(PgDiseaseRepository::new(pool.clone())),
            medicines: Arc::new(PgMedicineRepository::new(pool.clone())),
            vaccinations: Arc::new(PgVaccinationRepository::new(pool.clone())),
            medical_records: Arc::new(PgMedicalRecordRepository::new(pool.clone())),
            procurements: Arc::new(PgProcurementRepository::new(pool.clone())),
            orders: Arc::new(PgOrderRepository::new(pool.clone())),
            insurance: Arc::new(PgInsuranceRepository::new(pool.clone())),
            roles: Arc::new(PgRoleRepository::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool.clone())),
            reports: Arc::new(PgReportRepository::new(pool.clone())),
            audit: Arc::new(PgAuditRepository::new(pool)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("bò"), "%bò%");
        assert_eq!(contains_pattern("50%_a\\b"), "%50\\%\\_a\\\\b%");
    }

    #[test]
    fn test_default_config() {
        let config = DbConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        std::env::set_var("DATABASE_URL", "postgresql://localhost/farm_test");
        std::env::set_var("DB_MAX_CONNECTIONS", "15");

        let config = DbConfig::from_env().unwrap();
        assert_eq!(config.max_connections, 15);
        assert!(config.url.contains("farm_test"));

        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("DB_MAX_CONNECTIONS");
    }

    #[test]
    #[serial]
    fn test_config_from_env_missing_url() {
        std::env::remove_var("DATABASE_URL");
        assert!(DbConfig::from_env().is_err());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            DbError::not_found("Livestock", "A-000001").to_string(),
            "Livestock 'A-000001' not found"
        );
        assert_eq!(
            DbError::invalid_state("batch import", "COMPLETED", "cancel").to_string(),
            "Cannot cancel batch import in status COMPLETED"
        );
    }

    #[test]
    fn test_ensure_transition() {
        use farm_common::types::LivestockStatus;

        assert!(ensure_transition(
            "livestock",
            LivestockStatus::Healthy,
            LivestockStatus::Sick,
            "change status of"
        )
        .is_ok());

        let err = ensure_transition(
            "livestock",
            LivestockStatus::Dead,
            LivestockStatus::Healthy,
            "change status of",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Cannot change status of livestock in status DEAD");
    }

    #[test]
    fn test_classify_passes_through_other_errors() {
        let err = classify(sqlx::Error::RowNotFound, "Species", "Cow");
        assert!(matches!(err, DbError::Sqlx(sqlx::Error::RowNotFound)));
    }
}
