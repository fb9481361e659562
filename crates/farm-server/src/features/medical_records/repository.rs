use async_trait::async_trait;
use chrono::Utc;
use farm_common::types::{LivestockStatus, MedicalRecordStatus};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{
    status_on_diagnosis, status_on_recovery, MedicalRecord, MedicalRecordFilter,
    MedicalRecordRequest,
};
use crate::db::{as_reference, ensure_reference, DbError, DbResult};
use crate::features::livestock::repository::{lock_livestock, set_livestock_status};
use crate::features::shared::{normalize, Paginated};

#[async_trait]
pub trait MedicalRecordRepository: Send + Sync {
    /// Opens a TREATING record and marks the animal SICK
    async fn create(
        &self,
        req: MedicalRecordRequest,
        actor: Option<Uuid>,
    ) -> DbResult<MedicalRecord>;
    async fn get(&self, id: Uuid) -> DbResult<MedicalRecord>;
    async fn list(&self, filter: MedicalRecordFilter) -> DbResult<Paginated<MedicalRecord>>;
    async fn recover(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<MedicalRecord>;
    async fn mark_dead(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<MedicalRecord>;
}

pub struct PgMedicalRecordRepository {
    pool: PgPool,
}

impl PgMedicalRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn lock_record(conn: &mut PgConnection, id: Uuid) -> DbResult<MedicalRecord> {
    sqlx::query_as::<_, MedicalRecord>("SELECT * FROM medical_records WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DbError::not_found("Medical record", id))
}

async fn save_outcome(
    conn: &mut PgConnection,
    record: &MedicalRecord,
    actor: Option<Uuid>,
) -> DbResult<MedicalRecord> {
    sqlx::query_as::<_, MedicalRecord>(
        r#"
        UPDATE medical_records
        SET status = $2, closed_at = $3, updated_by = $4, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(record.id)
    .bind(record.status.as_str())
    .bind(record.closed_at)
    .bind(actor)
    .fetch_one(conn)
    .await
    .map_err(DbError::from)
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &MedicalRecordFilter) {
    qb.push(" WHERE TRUE");
    if let Some(livestock_id) = filter.livestock_id {
        qb.push(" AND livestock_id = ").push_bind(livestock_id);
    }
    if let Some(disease_id) = filter.disease_id {
        qb.push(" AND disease_id = ").push_bind(disease_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
}

#[async_trait]
impl MedicalRecordRepository for PgMedicalRecordRepository {
    async fn create(
        &self,
        req: MedicalRecordRequest,
        actor: Option<Uuid>,
    ) -> DbResult<MedicalRecord> {
        let mut tx = self.pool.begin().await?;
        let livestock = lock_livestock(&mut tx, req.livestock_id)
            .await
            .map_err(as_reference)?;
        if !livestock.status.is_on_farm() {
            return Err(DbError::invalid_state(
                "livestock",
                livestock.status,
                "open a medical record for",
            ));
        }
        ensure_reference(&mut tx, "diseases", "Disease", req.disease_id).await?;
        if let Some(medicine_id) = req.medicine_id {
            ensure_reference(&mut tx, "medicines", "Medicine", medicine_id).await?;
        }

        let record = sqlx::query_as::<_, MedicalRecord>(
            r#"
            INSERT INTO medical_records
                (livestock_id, disease_id, medicine_id, diagnosed_at, treatment,
                 created_by, updated_by)
            VALUES ($1, $2, $3, COALESCE($4, NOW()), $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(req.livestock_id)
        .bind(req.disease_id)
        .bind(req.medicine_id)
        .bind(req.diagnosed_at)
        .bind(normalize(req.treatment))
        .bind(actor)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(status) = status_on_diagnosis(livestock.status) {
            set_livestock_status(&mut tx, livestock.id, status, actor).await?;
        }
        tx.commit().await?;

        tracing::info!(
            medical_record_id = %record.id,
            livestock_id = %record.livestock_id,
            disease_id = %record.disease_id,
            "Medical record opened"
        );
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> DbResult<MedicalRecord> {
        sqlx::query_as::<_, MedicalRecord>("SELECT * FROM medical_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Medical record", id))
    }

    async fn list(&self, filter: MedicalRecordFilter) -> DbResult<Paginated<MedicalRecord>> {
        let page = filter.page_request();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM medical_records");
        push_filters(&mut count, &filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM medical_records");
        push_filters(&mut query, &filter);
        query
            .push(" ORDER BY diagnosed_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = query
            .build_query_as::<MedicalRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Paginated::new(items, &page, total))
    }

    async fn recover(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<MedicalRecord> {
        let mut tx = self.pool.begin().await?;
        let mut record = lock_record(&mut tx, id).await?;
        let livestock = lock_livestock(&mut tx, record.livestock_id).await?;

        record.close(MedicalRecordStatus::Recovered, "recover", Utc::now())?;
        let record = save_outcome(&mut tx, &record, actor).await?;

        let still_treating: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM medical_records WHERE livestock_id = $1 AND status = $2)",
        )
        .bind(livestock.id)
        .bind(MedicalRecordStatus::Treating.as_str())
        .fetch_one(&mut *tx)
        .await?;

        if !still_treating {
            if let Some(status) = status_on_recovery(livestock.status) {
                set_livestock_status(&mut tx, livestock.id, status, actor).await?;
            }
        }
        tx.commit().await?;

        tracing::info!(medical_record_id = %id, livestock_id = %record.livestock_id, still_treating, "Medical record recovered");
        Ok(record)
    }

    async fn mark_dead(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<MedicalRecord> {
        let mut tx = self.pool.begin().await?;
        let mut record = lock_record(&mut tx, id).await?;
        let livestock = lock_livestock(&mut tx, record.livestock_id).await?;

        record.close(MedicalRecordStatus::Dead, "mark dead", Utc::now())?;
        let record = save_outcome(&mut tx, &record, actor).await?;
        if livestock.status.is_on_farm() {
            set_livestock_status(&mut tx, livestock.id, LivestockStatus::Dead, actor).await?;
        }
        tx.commit().await?;

        tracing::warn!(medical_record_id = %id, livestock_id = %record.livestock_id, "Livestock died under treatment");
        Ok(record)
    }
}
