use async_trait::async_trait;
use chrono::Utc;
use farm_common::types::BatchImportStatus;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{
    BatchImport, BatchImportDetail, BatchImportFilter, BatchImportRequest, BatchImportWithDetails,
};
use crate::db::{as_reference, contains_pattern, ensure_reference, DbError, DbResult};
use crate::features::livestock::repository::lock_livestock;
use crate::features::shared::Paginated;

#[async_trait]
pub trait BatchImportRepository: Send + Sync {
    async fn create(&self, req: BatchImportRequest, actor: Option<Uuid>) -> DbResult<BatchImport>;
    async fn get(&self, id: Uuid) -> DbResult<BatchImportWithDetails>;
    async fn list(&self, filter: BatchImportFilter) -> DbResult<Paginated<BatchImport>>;
    /// PENDING batches only
    async fn update(
        &self,
        id: Uuid,
        req: BatchImportRequest,
        actor: Option<Uuid>,
    ) -> DbResult<BatchImport>;
    async fn add_livestock(
        &self,
        id: Uuid,
        livestock_id: Uuid,
        actor: Option<Uuid>,
    ) -> DbResult<BatchImportWithDetails>;
    async fn remove_livestock(
        &self,
        id: Uuid,
        livestock_id: Uuid,
        actor: Option<Uuid>,
    ) -> DbResult<BatchImportWithDetails>;
    async fn complete(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<BatchImport>;
    async fn cancel(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<BatchImport>;
    async fn delete(&self, id: Uuid) -> DbResult<()>;
}

pub struct PgBatchImportRepository {
    pool: PgPool,
}

impl PgBatchImportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn transition(
        &self,
        id: Uuid,
        to: BatchImportStatus,
        action: &'static str,
        actor: Option<Uuid>,
    ) -> DbResult<BatchImport> {
        let mut tx = self.pool.begin().await?;
        let mut batch = lock_batch(&mut tx, id).await?;
        batch.transition(to, action, Utc::now())?;
        let batch = save_progress(&mut tx, &batch, actor).await?;
        tx.commit().await?;

        tracing::info!(batch_import_id = %id, status = %to, "Batch import status changed");
        Ok(batch)
    }
}

async fn lock_batch(conn: &mut PgConnection, id: Uuid) -> DbResult<BatchImport> {
    sqlx::query_as::<_, BatchImport>("SELECT * FROM batch_imports WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DbError::not_found("Batch import", id))
}

/// Persist quantity, status and completion time
async fn save_progress(
    conn: &mut PgConnection,
    batch: &BatchImport,
    actor: Option<Uuid>,
) -> DbResult<BatchImport> {
    sqlx::query_as::<_, BatchImport>(
        r#"
        UPDATE batch_imports
        SET imported_quantity = $2, status = $3, completed_at = $4,
            updated_by = $5, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(batch.id)
    .bind(batch.imported_quantity)
    .bind(batch.status.as_str())
    .bind(batch.completed_at)
    .bind(actor)
    .fetch_one(conn)
    .await
    .map_err(DbError::from)
}

async fn load_details(conn: &mut PgConnection, id: Uuid) -> DbResult<Vec<BatchImportDetail>> {
    sqlx::query_as::<_, BatchImportDetail>(
        r#"
        SELECT d.id, d.batch_import_id, d.livestock_id, l.inspection_code,
               l.status AS livestock_status, d.imported_at
        FROM batch_import_details d
        JOIN livestock l ON l.id = d.livestock_id
        WHERE d.batch_import_id = $1
        ORDER BY d.imported_at
        "#,
    )
    .bind(id)
    .fetch_all(conn)
    .await
    .map_err(DbError::from)
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &BatchImportFilter) {
    qb.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(keyword) = &filter.keyword {
        let pattern = contains_pattern(keyword);
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR supplier ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl BatchImportRepository for PgBatchImportRepository {
    async fn create(&self, req: BatchImportRequest, actor: Option<Uuid>) -> DbResult<BatchImport> {
        let mut tx = self.pool.begin().await?;
        if let Some(barn_id) = req.barn_id {
            ensure_reference(&mut tx, "barns", "Barn", barn_id).await?;
        }

        let batch = sqlx::query_as::<_, BatchImport>(
            r#"
            INSERT INTO batch_imports
                (name, supplier, barn_id, expected_quantity, expected_import_date,
                 created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(req.name.trim())
        .bind(req.supplier.trim())
        .bind(req.barn_id)
        .bind(req.expected_quantity)
        .bind(req.expected_import_date)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(batch)
    }

    async fn get(&self, id: Uuid) -> DbResult<BatchImportWithDetails> {
        let mut conn = self.pool.acquire().await?;
        let batch = sqlx::query_as::<_, BatchImport>("SELECT * FROM batch_imports WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("Batch import", id))?;
        let details = load_details(&mut conn, id).await?;
        Ok(BatchImportWithDetails { batch, details })
    }

    async fn list(&self, filter: BatchImportFilter) -> DbResult<Paginated<BatchImport>> {
        let page = filter.page_request();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM batch_imports");
        push_filters(&mut count, &filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM batch_imports");
        push_filters(&mut query, &filter);
        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = query.build_query_as::<BatchImport>().fetch_all(&self.pool).await?;

        Ok(Paginated::new(items, &page, total))
    }

    async fn update(
        &self,
        id: Uuid,
        req: BatchImportRequest,
        actor: Option<Uuid>,
    ) -> DbResult<BatchImport> {
        let mut tx = self.pool.begin().await?;
        lock_batch(&mut tx, id).await?.ensure_editable()?;
        if let Some(barn_id) = req.barn_id {
            ensure_reference(&mut tx, "barns", "Barn", barn_id).await?;
        }

        let batch = sqlx::query_as::<_, BatchImport>(
            r#"
            UPDATE batch_imports
            SET name = $2, supplier = $3, barn_id = $4, expected_quantity = $5,
                expected_import_date = $6, updated_by = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(req.name.trim())
        .bind(req.supplier.trim())
        .bind(req.barn_id)
        .bind(req.expected_quantity)
        .bind(req.expected_import_date)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(batch)
    }

    async fn add_livestock(
        &self,
        id: Uuid,
        livestock_id: Uuid,
        actor: Option<Uuid>,
    ) -> DbResult<BatchImportWithDetails> {
        let mut tx = self.pool.begin().await?;
        let mut batch = lock_batch(&mut tx, id).await?;
        let livestock = lock_livestock(&mut tx, livestock_id).await.map_err(as_reference)?;

        if !livestock.status.is_on_farm() {
            return Err(DbError::invalid_state("livestock", livestock.status, "import"));
        }

        let already_imported: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM batch_import_details WHERE livestock_id = $1)",
        )
        .bind(livestock_id)
        .fetch_one(&mut *tx)
        .await?;
        if already_imported {
            return Err(DbError::duplicate("Imported livestock", &livestock.inspection_code));
        }

        batch.register_livestock(Utc::now())?;

        sqlx::query(
            "INSERT INTO batch_import_details (batch_import_id, livestock_id, created_by) VALUES ($1, $2, $3)",
        )
        .bind(id)
        .bind(livestock_id)
        .bind(actor)
        .execute(&mut *tx)
        .await?;

        let batch = save_progress(&mut tx, &batch, actor).await?;

        if livestock.barn_id.is_none() {
            if let Some(barn_id) = batch.barn_id {
                sqlx::query(
                    "UPDATE livestock SET barn_id = $2, updated_by = $3, updated_at = NOW() WHERE id = $1",
                )
                .bind(livestock_id)
                .bind(barn_id)
                .bind(actor)
                .execute(&mut *tx)
                .await?;
            }
        }

        let details = load_details(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(
            batch_import_id = %id,
            livestock_id = %livestock_id,
            imported = batch.imported_quantity,
            expected = batch.expected_quantity,
            status = %batch.status,
            "Livestock added to import batch"
        );
        Ok(BatchImportWithDetails { batch, details })
    }

    async fn remove_livestock(
        &self,
        id: Uuid,
        livestock_id: Uuid,
        actor: Option<Uuid>,
    ) -> DbResult<BatchImportWithDetails> {
        let mut tx = self.pool.begin().await?;
        let mut batch = lock_batch(&mut tx, id).await?;
        batch.unregister_livestock()?;

        let removed = sqlx::query(
            "DELETE FROM batch_import_details WHERE batch_import_id = $1 AND livestock_id = $2",
        )
        .bind(id)
        .bind(livestock_id)
        .execute(&mut *tx)
        .await?;
        if removed.rows_affected() == 0 {
            return Err(DbError::not_found("Import detail", livestock_id));
        }

        let batch = save_progress(&mut tx, &batch, actor).await?;
        let details = load_details(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(batch_import_id = %id, livestock_id = %livestock_id, "Livestock removed from import batch");
        Ok(BatchImportWithDetails { batch, details })
    }

    async fn complete(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<BatchImport> {
        self.transition(id, BatchImportStatus::Completed, "complete", actor)
            .await
    }

    async fn cancel(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<BatchImport> {
        self.transition(id, BatchImportStatus::Cancelled, "cancel", actor)
            .await
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        lock_batch(&mut tx, id).await?.ensure_deletable()?;

        let has_details: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM batch_import_details WHERE batch_import_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if has_details {
            return Err(DbError::conflict("Batch import still has livestock"));
        }

        sqlx::query("DELETE FROM batch_imports WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
