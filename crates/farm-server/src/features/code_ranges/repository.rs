use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::models::{format_code, AllocatedCode, CodeRange, CodeRangeFilter, CreateCodeRangeRequest};
use crate::db::{classify, missing_reference, DbError, DbResult};
use crate::features::shared::Paginated;

pub const EXHAUSTED: &str = "inspection codes exhausted";

#[async_trait]
pub trait CodeRangeRepository: Send + Sync {
    /// Rejects ranges overlapping another range of the same species
    async fn create(&self, req: CreateCodeRangeRequest, actor: Option<Uuid>) -> DbResult<CodeRange>;
    async fn get(&self, id: Uuid) -> DbResult<CodeRange>;
    async fn list(&self, filter: CodeRangeFilter) -> DbResult<Paginated<CodeRange>>;
    /// Only ranges that never handed out a code can be deleted
    async fn delete(&self, id: Uuid) -> DbResult<()>;
    /// Hand out the next code of the species' first non-exhausted range
    async fn allocate_next(&self, species_id: Uuid) -> DbResult<AllocatedCode>;
}

pub struct PgCodeRangeRepository {
    pool: PgPool,
    code_width: usize,
}

impl PgCodeRangeRepository {
    pub fn new(pool: PgPool, code_width: usize) -> Self {
        Self { pool, code_width }
    }
}

/// Allocate inside the caller's transaction; the range row stays locked
/// until it commits. Codes already taken by livestock created with an
/// explicit code are skipped and consumed.
pub async fn allocate_next_in(
    conn: &mut PgConnection,
    species_id: Uuid,
    code_width: usize,
) -> DbResult<AllocatedCode> {
    loop {
        let range = sqlx::query_as::<_, CodeRange>(
            r#"
            SELECT * FROM inspection_code_ranges
            WHERE species_id = $1 AND current_code <= end_code
            ORDER BY start_code
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(species_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::conflict(format!("{} for species {}", EXHAUSTED, species_id)))?;

        let mut value = range.current_code;
        let mut allocated = None;
        while value <= range.end_code {
            let code = format_code(value, code_width);
            value += 1;
            let taken: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM livestock WHERE inspection_code = $1)",
            )
            .bind(&code)
            .fetch_one(&mut *conn)
            .await?;
            if !taken {
                allocated = Some(code);
                break;
            }
            tracing::debug!(species_id = %species_id, code = %code, "Skipping inspection code already in use");
        }

        sqlx::query(
            "UPDATE inspection_code_ranges SET current_code = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(range.id)
        .bind(value)
        .execute(&mut *conn)
        .await?;

        if let Some(code) = allocated {
            return Ok(AllocatedCode {
                species_id,
                range_id: range.id,
                code,
            });
        }
    }
}

#[async_trait]
impl CodeRangeRepository for PgCodeRangeRepository {
    async fn create(&self, req: CreateCodeRangeRequest, actor: Option<Uuid>) -> DbResult<CodeRange> {
        let mut tx = self.pool.begin().await?;

        // Serialises range creation per species
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM species WHERE id = $1 FOR UPDATE")
            .bind(req.species_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| missing_reference("Species", req.species_id))?;

        let overlapping: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM inspection_code_ranges
                WHERE species_id = $1 AND start_code <= $3 AND end_code >= $2
            )
            "#,
        )
        .bind(req.species_id)
        .bind(req.start_code)
        .bind(req.end_code)
        .fetch_one(&mut *tx)
        .await?;

        if overlapping {
            return Err(DbError::conflict(format!(
                "Range {}-{} overlaps an existing range of this species",
                req.start_code, req.end_code
            )));
        }

        let range = sqlx::query_as::<_, CodeRange>(
            r#"
            INSERT INTO inspection_code_ranges
                (species_id, start_code, end_code, current_code, created_by, updated_by)
            VALUES ($1, $2, $3, $2, $4, $4)
            RETURNING *
            "#,
        )
        .bind(req.species_id)
        .bind(req.start_code)
        .bind(req.end_code)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify(e, "Code range", req.start_code))?;

        tx.commit().await?;
        Ok(range)
    }

    async fn get(&self, id: Uuid) -> DbResult<CodeRange> {
        sqlx::query_as::<_, CodeRange>("SELECT * FROM inspection_code_ranges WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Code range", id))
    }

    async fn list(&self, filter: CodeRangeFilter) -> DbResult<Paginated<CodeRange>> {
        let page = filter.page_request();

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM inspection_code_ranges WHERE ($1::uuid IS NULL OR species_id = $1)",
        )
        .bind(filter.species_id)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, CodeRange>(
            r#"
            SELECT * FROM inspection_code_ranges
            WHERE ($1::uuid IS NULL OR species_id = $1)
            ORDER BY species_id, start_code
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(filter.species_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Paginated::new(items, &page, total))
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let range = self.get(id).await?;
        if range.is_used() {
            return Err(DbError::conflict(
                "Code range has already issued codes and cannot be deleted",
            ));
        }

        sqlx::query("DELETE FROM inspection_code_ranges WHERE id = $1 AND current_code = start_code")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn allocate_next(&self, species_id: Uuid) -> DbResult<AllocatedCode> {
        let mut tx = self.pool.begin().await?;
        let allocated = allocate_next_in(&mut *tx, species_id, self.code_width).await?;
        tx.commit().await?;

        tracing::debug!(species_id = %species_id, code = %allocated.code, "Inspection code allocated");
        Ok(allocated)
    }
}
