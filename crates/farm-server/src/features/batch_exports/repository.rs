use async_trait::async_trait;
use chrono::Utc;
use farm_common::types::{BatchExportStatus, LivestockStatus};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{
    BatchExport, BatchExportDetail, BatchExportFilter, BatchExportRequest, BatchExportWithDetails,
};
use crate::db::{as_reference, classify, contains_pattern, DbError, DbResult};
use crate::features::livestock::repository::{lock_livestock, set_livestock_status};
use crate::features::shared::{normalize, Paginated};

#[async_trait]
pub trait BatchExportRepository: Send + Sync {
    async fn create(&self, req: BatchExportRequest, actor: Option<Uuid>) -> DbResult<BatchExport>;
    async fn get(&self, id: Uuid) -> DbResult<BatchExportWithDetails>;
    async fn list(&self, filter: BatchExportFilter) -> DbResult<Paginated<BatchExport>>;
    async fn update(
        &self,
        id: Uuid,
        req: BatchExportRequest,
        actor: Option<Uuid>,
    ) -> DbResult<BatchExport>;
    /// Marks the animal EXPORTED and starts its warranty
    async fn add_livestock(
        &self,
        id: Uuid,
        livestock_id: Uuid,
        unit_price: f64,
        actor: Option<Uuid>,
    ) -> DbResult<BatchExportWithDetails>;
    async fn complete(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<BatchExport>;
    async fn cancel(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<BatchExport>;
    async fn delete(&self, id: Uuid) -> DbResult<()>;
}

pub struct PgBatchExportRepository {
    pool: PgPool,
    default_warranty_days: i32,
}

impl PgBatchExportRepository {
    pub fn new(pool: PgPool, default_warranty_days: i32) -> Self {
        Self {
            pool,
            default_warranty_days,
        }
    }

    async fn transition(
        &self,
        id: Uuid,
        to: BatchExportStatus,
        action: &'static str,
        actor: Option<Uuid>,
    ) -> DbResult<BatchExport> {
        let mut tx = self.pool.begin().await?;
        let mut batch = lock_batch(&mut tx, id).await?;
        batch.transition(to, action, Utc::now())?;
        let batch = save_progress(&mut tx, &batch, actor).await?;
        tx.commit().await?;

        tracing::info!(batch_export_id = %id, status = %to, "Batch export status changed");
        Ok(batch)
    }
}

async fn lock_batch(conn: &mut PgConnection, id: Uuid) -> DbResult<BatchExport> {
    sqlx::query_as::<_, BatchExport>("SELECT * FROM batch_exports WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DbError::not_found("Batch export", id))
}

async fn save_progress(
    conn: &mut PgConnection,
    batch: &BatchExport,
    actor: Option<Uuid>,
) -> DbResult<BatchExport> {
    sqlx::query_as::<_, BatchExport>(
        r#"
        UPDATE batch_exports
        SET exported_quantity = $2, status = $3, completed_at = $4,
            updated_by = $5, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(batch.id)
    .bind(batch.exported_quantity)
    .bind(batch.status.as_str())
    .bind(batch.completed_at)
    .bind(actor)
    .fetch_one(conn)
    .await
    .map_err(DbError::from)
}

async fn load_details(conn: &mut PgConnection, id: Uuid) -> DbResult<Vec<BatchExportDetail>> {
    sqlx::query_as::<_, BatchExportDetail>(
        r#"
        SELECT d.id, d.batch_export_id, d.livestock_id, l.inspection_code,
               l.status AS livestock_status, d.exported_at, d.warranty_until, d.unit_price
        FROM batch_export_details d
        JOIN livestock l ON l.id = d.livestock_id
        WHERE d.batch_export_id = $1
        ORDER BY d.exported_at
        "#,
    )
    .bind(id)
    .fetch_all(conn)
    .await
    .map_err(DbError::from)
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &BatchExportFilter) {
    qb.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(keyword) = &filter.keyword {
        let pattern = contains_pattern(keyword);
        qb.push(" AND (customer_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR customer_phone ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl BatchExportRepository for PgBatchExportRepository {
    async fn create(&self, req: BatchExportRequest, actor: Option<Uuid>) -> DbResult<BatchExport> {
        let warranty_days = req.warranty_days.unwrap_or(self.default_warranty_days);
        sqlx::query_as::<_, BatchExport>(
            r#"
            INSERT INTO batch_exports
                (customer_name, customer_phone, customer_address, total_livestock,
                 export_date, warranty_days, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *
            "#,
        )
        .bind(req.customer_name.trim())
        .bind(normalize(req.customer_phone))
        .bind(normalize(req.customer_address))
        .bind(req.total_livestock)
        .bind(req.export_date)
        .bind(warranty_days)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)
    }

    async fn get(&self, id: Uuid) -> DbResult<BatchExportWithDetails> {
        let mut conn = self.pool.acquire().await?;
        let batch = sqlx::query_as::<_, BatchExport>("SELECT * FROM batch_exports WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("Batch export", id))?;
        let details = load_details(&mut conn, id).await?;
        Ok(BatchExportWithDetails { batch, details })
    }

    async fn list(&self, filter: BatchExportFilter) -> DbResult<Paginated<BatchExport>> {
        let page = filter.page_request();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM batch_exports");
        push_filters(&mut count, &filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM batch_exports");
        push_filters(&mut query, &filter);
        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = query.build_query_as::<BatchExport>().fetch_all(&self.pool).await?;

        Ok(Paginated::new(items, &page, total))
    }

    async fn update(
        &self,
        id: Uuid,
        req: BatchExportRequest,
        actor: Option<Uuid>,
    ) -> DbResult<BatchExport> {
        let mut tx = self.pool.begin().await?;
        let current = lock_batch(&mut tx, id).await?;
        current.ensure_editable()?;

        let batch = sqlx::query_as::<_, BatchExport>(
            r#"
            UPDATE batch_exports
            SET customer_name = $2, customer_phone = $3, customer_address = $4,
                total_livestock = $5, export_date = $6, warranty_days = $7,
                updated_by = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(req.customer_name.trim())
        .bind(normalize(req.customer_phone))
        .bind(normalize(req.customer_address))
        .bind(req.total_livestock)
        .bind(req.export_date)
        .bind(req.warranty_days.unwrap_or(current.warranty_days))
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
        unit_price: f64,
        actor: Option<Uuid>,
    ) -> DbResult<BatchExportWithDetails> {
        let mut tx = self.pool.begin().await?;
        let mut batch = lock_batch(&mut tx, id).await?;
        let livestock = lock_livestock(&mut tx, livestock_id).await.map_err(as_reference)?;

        if livestock.status != LivestockStatus::Healthy {
            return Err(DbError::invalid_state("livestock", livestock.status, "export"));
        }

        let now = Utc::now();
        batch.register_livestock(now)?;

        sqlx::query(
            r#"
            INSERT INTO batch_export_details
                (batch_export_id, livestock_id, exported_at, warranty_until, unit_price, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(livestock_id)
        .bind(now)
        .bind(batch.warranty_until(now))
        .bind(unit_price)
        .bind(actor)
        .execute(&mut *tx)
        .await
        .map_err(|e| classify(e, "Exported livestock", &livestock.inspection_code))?;

        set_livestock_status(&mut tx, livestock_id, LivestockStatus::Exported, actor).await?;
        let batch = save_progress(&mut tx, &batch, actor).await?;
        let details = load_details(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(
            batch_export_id = %id,
            livestock_id = %livestock_id,
            exported = batch.exported_quantity,
            total = batch.total_livestock,
            status = %batch.status,
            "Livestock exported"
        );
        Ok(BatchExportWithDetails { batch, details })
    }

    async fn complete(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<BatchExport> {
        self.transition(id, BatchExportStatus::Completed, "complete", actor)
            .await
    }

    async fn cancel(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<BatchExport> {
        self.transition(id, BatchExportStatus::Cancelled, "cancel", actor)
            .await
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        lock_batch(&mut tx, id).await?.ensure_deletable()?;

        let referenced: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM batch_export_details WHERE batch_export_id = $1)
                OR EXISTS(SELECT 1 FROM insurance_requests WHERE batch_export_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if referenced {
            return Err(DbError::conflict("Batch export still has livestock"));
        }

        sqlx::query("DELETE FROM batch_exports WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
