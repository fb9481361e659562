use async_trait::async_trait;
use chrono::{DateTime, Utc};
use farm_common::types::VaccinationStatus;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{
    BatchVaccination, BatchVaccinationWithDetails, VaccinationDetail, VaccinationFilter,
    VaccinationRequest,
};
use crate::db::{as_reference, DbError, DbResult};
use crate::features::livestock::repository::lock_livestock;
use crate::features::medicines::repository::fetch_medicine;
use crate::features::shared::{normalize, Paginated};

#[async_trait]
pub trait VaccinationRepository: Send + Sync {
    async fn create(
        &self,
        req: VaccinationRequest,
        actor: Option<Uuid>,
    ) -> DbResult<BatchVaccination>;
    async fn get(&self, id: Uuid) -> DbResult<BatchVaccinationWithDetails>;
    async fn list(&self, filter: VaccinationFilter) -> DbResult<Paginated<BatchVaccination>>;
    async fn update(
        &self,
        id: Uuid,
        req: VaccinationRequest,
        actor: Option<Uuid>,
    ) -> DbResult<BatchVaccination>;
    async fn add_livestock(
        &self,
        id: Uuid,
        livestock_id: Uuid,
        vaccinated_at: Option<DateTime<Utc>>,
        actor: Option<Uuid>,
    ) -> DbResult<BatchVaccinationWithDetails>;
    async fn complete(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<BatchVaccination>;
    async fn cancel(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<BatchVaccination>;
    async fn delete(&self, id: Uuid) -> DbResult<()>;
}

pub struct PgVaccinationRepository {
    pool: PgPool,
}

impl PgVaccinationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn transition(
        &self,
        id: Uuid,
        to: VaccinationStatus,
        action: &'static str,
        actor: Option<Uuid>,
    ) -> DbResult<BatchVaccination> {
        let mut tx = self.pool.begin().await?;
        let mut batch = lock_batch(&mut tx, id).await?;
        batch.transition(to, action, Utc::now())?;
        let batch = save_status(&mut tx, &batch, actor).await?;
        tx.commit().await?;

        tracing::info!(batch_vaccination_id = %id, status = %to, "Vaccination status changed");
        Ok(batch)
    }
}

/// The medicine of a campaign must exist and be a vaccine
async fn ensure_vaccine(conn: &mut PgConnection, medicine_id: Uuid) -> DbResult<()> {
    let medicine = fetch_medicine(conn, medicine_id)
        .await
        .map_err(as_reference)?;
    if medicine.is_vaccine() {
        Ok(())
    } else {
        Err(DbError::validation(format!(
            "Medicine '{}' is a {} and cannot be used for vaccination",
            medicine.name, medicine.medicine_type
        )))
    }
}

async fn lock_batch(conn: &mut PgConnection, id: Uuid) -> DbResult<BatchVaccination> {
    sqlx::query_as::<_, BatchVaccination>(
        "SELECT * FROM batch_vaccinations WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| DbError::not_found("Batch vaccination", id))
}

async fn save_status(
    conn: &mut PgConnection,
    batch: &BatchVaccination,
    actor: Option<Uuid>,
) -> DbResult<BatchVaccination> {
    sqlx::query_as::<_, BatchVaccination>(
        r#"
        UPDATE batch_vaccinations
        SET status = $2, completed_at = $3, updated_by = $4, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(batch.id)
    .bind(batch.status.as_str())
    .bind(batch.completed_at)
    .bind(actor)
    .fetch_one(conn)
    .await
    .map_err(DbError::from)
}

async fn load_details(conn: &mut PgConnection, id: Uuid) -> DbResult<Vec<VaccinationDetail>> {
    sqlx::query_as::<_, VaccinationDetail>(
        r#"
        SELECT d.id, d.batch_vaccination_id, d.livestock_id, l.inspection_code, d.vaccinated_at
        FROM batch_vaccination_details d
        JOIN livestock l ON l.id = d.livestock_id
        WHERE d.batch_vaccination_id = $1
        ORDER BY d.vaccinated_at
        "#,
    )
    .bind(id)
    .fetch_all(conn)
    .await
    .map_err(DbError::from)
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &VaccinationFilter) {
    qb.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(medicine_id) = filter.medicine_id {
        qb.push(" AND medicine_id = ").push_bind(medicine_id);
    }
    if let Some(from) = filter.from {
        qb.push(" AND scheduled_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND scheduled_at <= ").push_bind(to);
    }
}

#[async_trait]
impl VaccinationRepository for PgVaccinationRepository {
    async fn create(
        &self,
        req: VaccinationRequest,
        actor: Option<Uuid>,
    ) -> DbResult<BatchVaccination> {
        let mut tx = self.pool.begin().await?;
        ensure_vaccine(&mut tx, req.medicine_id).await?;

        let batch = sqlx::query_as::<_, BatchVaccination>(
            r#"
            INSERT INTO batch_vaccinations
                (name, medicine_id, scheduled_at, conductor, description, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(req.name.trim())
        .bind(req.medicine_id)
        .bind(req.scheduled_at)
        .bind(normalize(req.conductor))
        .bind(normalize(req.description))
        .bind(actor)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(batch)
    }

    async fn get(&self, id: Uuid) -> DbResult<BatchVaccinationWithDetails> {
        let mut conn = self.pool.acquire().await?;
        let batch =
            sqlx::query_as::<_, BatchVaccination>("SELECT * FROM batch_vaccinations WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or_else(|| DbError::not_found("Batch vaccination", id))?;
        let details = load_details(&mut conn, id).await?;
        Ok(BatchVaccinationWithDetails { batch, details })
    }

    async fn list(&self, filter: VaccinationFilter) -> DbResult<Paginated<BatchVaccination>> {
        let page = filter.page_request();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM batch_vaccinations");
        push_filters(&mut count, &filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM batch_vaccinations");
        push_filters(&mut query, &filter);
        query
            .push(" ORDER BY scheduled_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = query
            .build_query_as::<BatchVaccination>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Paginated::new(items, &page, total))
    }

    async fn update(
        &self,
        id: Uuid,
        req: VaccinationRequest,
        actor: Option<Uuid>,
    ) -> DbResult<BatchVaccination> {
        let mut tx = self.pool.begin().await?;
        lock_batch(&mut tx, id).await?.ensure_editable()?;
        ensure_vaccine(&mut tx, req.medicine_id).await?;

        let batch = sqlx::query_as::<_, BatchVaccination>(
            r#"
            UPDATE batch_vaccinations
            SET name = $2, medicine_id = $3, scheduled_at = $4, conductor = $5,
                description = $6, updated_by = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(req.name.trim())
        .bind(req.medicine_id)
        .bind(req.scheduled_at)
        .bind(normalize(req.conductor))
        .bind(normalize(req.description))
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
        vaccinated_at: Option<DateTime<Utc>>,
        actor: Option<Uuid>,
    ) -> DbResult<BatchVaccinationWithDetails> {
        let mut tx = self.pool.begin().await?;
        let mut batch = lock_batch(&mut tx, id).await?;
        let livestock = lock_livestock(&mut tx, livestock_id).await.map_err(as_reference)?;

        if !livestock.status.is_on_farm() {
            return Err(DbError::invalid_state("livestock", livestock.status, "vaccinate"));
        }

        let already: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM batch_vaccination_details
                          WHERE batch_vaccination_id = $1 AND livestock_id = $2)
            "#,
        )
        .bind(id)
        .bind(livestock_id)
        .fetch_one(&mut *tx)
        .await?;
        if already {
            return Err(DbError::duplicate("Vaccinated livestock", &livestock.inspection_code));
        }

        batch.register_livestock()?;

        sqlx::query(
            r#"
            INSERT INTO batch_vaccination_details
                (batch_vaccination_id, livestock_id, vaccinated_at, created_by)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(livestock_id)
        .bind(vaccinated_at.unwrap_or_else(Utc::now))
        .bind(actor)
        .execute(&mut *tx)
        .await?;

        let batch = save_status(&mut tx, &batch, actor).await?;
        let details = load_details(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(
            batch_vaccination_id = %id,
            livestock_id = %livestock_id,
            vaccinated = details.len(),
            "Livestock vaccinated"
        );
        Ok(BatchVaccinationWithDetails { batch, details })
    }

    async fn complete(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<BatchVaccination> {
        self.transition(id, VaccinationStatus::Completed, "complete", actor)
            .await
    }

    async fn cancel(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<BatchVaccination> {
        self.transition(id, VaccinationStatus::Cancelled, "cancel", actor)
            .await
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        lock_batch(&mut tx, id).await?.ensure_deletable()?;

        let has_details: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM batch_vaccination_details WHERE batch_vaccination_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if has_details {
            return Err(DbError::conflict("Batch vaccination already has vaccinated livestock"));
        }

        sqlx::query("DELETE FROM batch_vaccinations WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
