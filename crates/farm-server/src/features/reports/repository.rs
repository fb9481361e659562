use async_trait::async_trait;
use chrono::Utc;
use farm_common::types::{BatchExportStatus, BatchImportStatus, LivestockStatus};
use sqlx::{PgConnection, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use super::models::{species_summaries, tally, Dashboard, SpeciesStatusRow, SpeciesSummary, Tally};
use crate::db::DbResult;
use crate::features::livestock::LivestockSummary;

#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn dashboard(&self) -> DbResult<Dashboard>;
    async fn livestock_by_species(&self) -> DbResult<Vec<SpeciesSummary>>;
}

pub struct PgReportRepository {
    pool: PgPool,
}

impl PgReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `status, COUNT(*)` of a table, parsed into `S`
///
/// `table` must be a trusted identifier.
async fn count_by_status<S: FromStr + Copy>(
    conn: &mut PgConnection,
    table: &'static str,
) -> DbResult<Vec<(S, i64)>> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as(&format!("SELECT status, COUNT(*) FROM {} GROUP BY status", table))
            .fetch_all(conn)
            .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(status, count)| status.parse::<S>().ok().map(|s| (s, count)))
        .collect())
}

async fn species_rows(conn: &mut PgConnection) -> DbResult<Vec<SpeciesStatusRow>> {
    let rows: Vec<(Uuid, String, Option<String>, i64)> = sqlx::query_as(
        r#"
        SELECT s.id, s.name, l.status, COUNT(l.id)
        FROM species s
        LEFT JOIN livestock l ON l.species_id = s.id
        GROUP BY s.id, s.name, l.status
        ORDER BY s.name
        "#,
    )
    .fetch_all(conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(species_id, species_name, status, count)| SpeciesStatusRow {
            species_id,
            species_name,
            status: status.and_then(|s| s.parse().ok()),
            count,
        })
        .collect())
}

#[async_trait]
impl ReportRepository for PgReportRepository {
    async fn dashboard(&self) -> DbResult<Dashboard> {
        let mut conn = self.pool.acquire().await?;

        let livestock = LivestockSummary::from_counts(
            count_by_status::<LivestockStatus>(&mut conn, "livestock").await?,
        );
        let by_species = species_summaries(&species_rows(&mut conn).await?);
        let imports: Vec<Tally> = tally(
            BatchImportStatus::ALL,
            &count_by_status::<BatchImportStatus>(&mut conn, "batch_imports").await?,
        );
        let exports: Vec<Tally> = tally(
            BatchExportStatus::ALL,
            &count_by_status::<BatchExportStatus>(&mut conn, "batch_exports").await?,
        );

        let open_insurance_requests: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM insurance_requests WHERE status IN ('NEW', 'APPROVED')",
        )
        .fetch_one(&mut *conn)
        .await?;
        let active_vaccinations: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM batch_vaccinations WHERE status IN ('SCHEDULED', 'IN_PROGRESS')",
        )
        .fetch_one(&mut *conn)
        .await?;

        Ok(Dashboard {
            livestock,
            livestock_by_species: by_species.iter().map(SpeciesSummary::as_count).collect(),
            batch_imports_by_status: imports,
            batch_exports_by_status: exports,
            open_insurance_requests,
            active_vaccinations,
            generated_at: Utc::now(),
        })
    }

    async fn livestock_by_species(&self) -> DbResult<Vec<SpeciesSummary>> {
        let mut conn = self.pool.acquire().await?;
        Ok(species_summaries(&species_rows(&mut conn).await?))
    }
}
