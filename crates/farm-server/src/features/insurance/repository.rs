use async_trait::async_trait;
use chrono::Utc;
use farm_common::types::{InsuranceStatus, LivestockStatus};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{
    ensure_claimable, ensure_replaceable, CreateInsuranceRequest, InsuranceFilter,
    InsuranceRequest,
};
use crate::db::{as_reference, classify, ensure_reference, DbError, DbResult};
use crate::features::batch_exports::BatchExportDetail;
use crate::features::livestock::repository::{lock_livestock, set_livestock_status};
use crate::features::shared::Paginated;

#[async_trait]
pub trait InsuranceRepository: Send + Sync {
    async fn create(
        &self,
        req: CreateInsuranceRequest,
        actor: Option<Uuid>,
    ) -> DbResult<InsuranceRequest>;
    async fn get(&self, id: Uuid) -> DbResult<InsuranceRequest>;
    async fn list(&self, filter: InsuranceFilter) -> DbResult<Paginated<InsuranceRequest>>;
    async fn approve(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<InsuranceRequest>;
    async fn reject(
        &self,
        id: Uuid,
        reason: String,
        actor: Option<Uuid>,
    ) -> DbResult<InsuranceRequest>;
    async fn cancel(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<InsuranceRequest>;
    async fn complete(
        &self,
        id: Uuid,
        replacement_livestock_id: Uuid,
        actor: Option<Uuid>,
    ) -> DbResult<InsuranceRequest>;
}

pub struct PgInsuranceRepository {
    pool: PgPool,
}

impl PgInsuranceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn transition(
        &self,
        id: Uuid,
        to: InsuranceStatus,
        action: &'static str,
        actor: Option<Uuid>,
    ) -> DbResult<InsuranceRequest> {
        let mut tx = self.pool.begin().await?;
        let mut request = lock_request(&mut tx, id).await?;
        request.transition(to, action)?;
        let request = save_request(&mut tx, &request, actor).await?;
        tx.commit().await?;

        tracing::info!(insurance_request_id = %id, status = %to, "Insurance request status changed");
        Ok(request)
    }
}

async fn lock_request(conn: &mut PgConnection, id: Uuid) -> DbResult<InsuranceRequest> {
    sqlx::query_as::<_, InsuranceRequest>(
        "SELECT * FROM insurance_requests WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| DbError::not_found("Insurance request", id))
}

async fn save_request(
    conn: &mut PgConnection,
    request: &InsuranceRequest,
    actor: Option<Uuid>,
) -> DbResult<InsuranceRequest> {
    sqlx::query_as::<_, InsuranceRequest>(
        r#"
        UPDATE insurance_requests
        SET status = $2, reject_reason = $3, replacement_livestock_id = $4,
            updated_by = $5, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(request.id)
    .bind(request.status.as_str())
    .bind(&request.reject_reason)
    .bind(request.replacement_livestock_id)
    .bind(actor)
    .fetch_one(conn)
    .await
    .map_err(DbError::from)
}

async fn find_export_detail(
    conn: &mut PgConnection,
    batch_export_id: Uuid,
    livestock_id: Uuid,
) -> DbResult<BatchExportDetail> {
    sqlx::query_as::<_, BatchExportDetail>(
        r#"
        SELECT d.id, d.batch_export_id, d.livestock_id, l.inspection_code,
               l.status AS livestock_status, d.exported_at, d.warranty_until, d.unit_price
        FROM batch_export_details d
        JOIN livestock l ON l.id = d.livestock_id
        WHERE d.batch_export_id = $1 AND d.livestock_id = $2
        "#,
    )
    .bind(batch_export_id)
    .bind(livestock_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| {
        DbError::validation(format!(
            "Livestock '{}' was not exported in batch export '{}'",
            livestock_id, batch_export_id
        ))
    })
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &InsuranceFilter) {
    qb.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(batch_export_id) = filter.batch_export_id {
        qb.push(" AND batch_export_id = ").push_bind(batch_export_id);
    }
    if let Some(livestock_id) = filter.livestock_id {
        qb.push(" AND livestock_id = ").push_bind(livestock_id);
    }
}

#[async_trait]
impl InsuranceRepository for PgInsuranceRepository {
    async fn create(
        &self,
        req: CreateInsuranceRequest,
        actor: Option<Uuid>,
    ) -> DbResult<InsuranceRequest> {
        let mut tx = self.pool.begin().await?;

        ensure_reference(&mut tx, "batch_exports", "Batch export", req.batch_export_id).await?;
        let detail = find_export_detail(&mut tx, req.batch_export_id, req.livestock_id).await?;
        ensure_claimable(&detail, Utc::now())?;
        if let Some(disease_id) = req.disease_id {
            ensure_reference(&mut tx, "diseases", "Disease", disease_id).await?;
        }

        let open: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM insurance_requests
                WHERE livestock_id = $1 AND status IN ('NEW', 'APPROVED')
            )
            "#,
        )
        .bind(req.livestock_id)
        .fetch_one(&mut *tx)
        .await?;
        if open {
            return Err(DbError::conflict(format!(
                "Livestock '{}' already has an open insurance request",
                detail.inspection_code
            )));
        }

        let request = sqlx::query_as::<_, InsuranceRequest>(
            r#"
            INSERT INTO insurance_requests
                (livestock_id, batch_export_id, disease_id, reason, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *
            "#,
        )
        .bind(req.livestock_id)
        .bind(req.batch_export_id)
        .bind(req.disease_id)
        .bind(req.reason.trim())
        .bind(actor)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify(e, "Open insurance request for livestock", &detail.inspection_code))?;
        tx.commit().await?;

        tracing::info!(
            insurance_request_id = %request.id,
            livestock = %detail.inspection_code,
            batch_export_id = %request.batch_export_id,
            "Insurance request filed"
        );
        Ok(request)
    }

    async fn get(&self, id: Uuid) -> DbResult<InsuranceRequest> {
        sqlx::query_as::<_, InsuranceRequest>("SELECT * FROM insurance_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Insurance request", id))
    }

    async fn list(&self, filter: InsuranceFilter) -> DbResult<Paginated<InsuranceRequest>> {
        let page = filter.page_request();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM insurance_requests");
        push_filters(&mut count, &filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM insurance_requests");
        push_filters(&mut query, &filter);
        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = query
            .build_query_as::<InsuranceRequest>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Paginated::new(items, &page, total))
    }

    async fn approve(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<InsuranceRequest> {
        self.transition(id, InsuranceStatus::Approved, "approve", actor)
            .await
    }

    async fn reject(
        &self,
        id: Uuid,
        reason: String,
        actor: Option<Uuid>,
    ) -> DbResult<InsuranceRequest> {
        let mut tx = self.pool.begin().await?;
        let mut request = lock_request(&mut tx, id).await?;
        request.reject(&reason)?;
        let request = save_request(&mut tx, &request, actor).await?;
        tx.commit().await?;

        tracing::info!(insurance_request_id = %id, "Insurance request rejected");
        Ok(request)
    }

    async fn cancel(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<InsuranceRequest> {
        self.transition(id, InsuranceStatus::Cancelled, "cancel", actor)
            .await
    }

    async fn complete(
        &self,
        id: Uuid,
        replacement_livestock_id: Uuid,
        actor: Option<Uuid>,
    ) -> DbResult<InsuranceRequest> {
        let mut tx = self.pool.begin().await?;
        let mut request = lock_request(&mut tx, id).await?;
        request.complete(replacement_livestock_id)?;

        let replacement = lock_livestock(&mut tx, replacement_livestock_id)
            .await
            .map_err(as_reference)?;
        ensure_replaceable(replacement.status)?;

        set_livestock_status(&mut tx, replacement.id, LivestockStatus::Exported, actor).await?;
        let request = save_request(&mut tx, &request, actor).await?;
        tx.commit().await?;

        tracing::info!(
            insurance_request_id = %id,
            replacement = %replacement.inspection_code,
            "Insurance request completed with replacement"
        );
        Ok(request)
    }
}
