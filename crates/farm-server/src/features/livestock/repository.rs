use async_trait::async_trait;
use farm_common::types::LivestockStatus;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{
    CreateLivestockRequest, Livestock, LivestockFilter, LivestockSummary, UpdateLivestockRequest,
    VaccinationHistoryEntry,
};
use crate::db::{classify, contains_pattern, ensure_reference, ensure_transition, DbError, DbResult};
use crate::features::code_ranges::allocate_next_in;
use crate::features::shared::{normalize, Paginated};

#[async_trait]
pub trait LivestockRepository: Send + Sync {
    async fn create(&self, req: CreateLivestockRequest, actor: Option<Uuid>) -> DbResult<Livestock>;
    async fn get(&self, id: Uuid) -> DbResult<Livestock>;
    async fn get_by_code(&self, code: &str) -> DbResult<Livestock>;
    async fn list(&self, filter: LivestockFilter) -> DbResult<Paginated<Livestock>>;
    async fn update(
        &self,
        id: Uuid,
        req: UpdateLivestockRequest,
        actor: Option<Uuid>,
    ) -> DbResult<Livestock>;
    async fn change_status(
        &self,
        id: Uuid,
        status: LivestockStatus,
        actor: Option<Uuid>,
    ) -> DbResult<Livestock>;
    /// Only animals never enrolled in a batch or medical record
    async fn delete(&self, id: Uuid) -> DbResult<()>;
    async fn vaccination_history(&self, id: Uuid) -> DbResult<Vec<VaccinationHistoryEntry>>;
    async fn summary(&self) -> DbResult<LivestockSummary>;
}

pub struct PgLivestockRepository {
    pool: PgPool,
    code_width: usize,
}

impl PgLivestockRepository {
    pub fn new(pool: PgPool, code_width: usize) -> Self {
        Self { pool, code_width }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &LivestockFilter) {
    qb.push(" WHERE TRUE");
    if let Some(species_id) = filter.species_id {
        qb.push(" AND species_id = ").push_bind(species_id);
    }
    if let Some(barn_id) = filter.barn_id {
        qb.push(" AND barn_id = ").push_bind(barn_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(keyword) = &filter.keyword {
        let pattern = contains_pattern(keyword);
        qb.push(" AND (inspection_code ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR color ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR origin ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Row lock used by every write that depends on an animal's status
pub(crate) async fn lock_livestock(
    conn: &mut sqlx::PgConnection,
    id: Uuid,
) -> DbResult<Livestock> {
    sqlx::query_as::<_, Livestock>("SELECT * FROM livestock WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DbError::not_found("Livestock", id))
}

pub(crate) async fn set_livestock_status(
    conn: &mut sqlx::PgConnection,
    id: Uuid,
    status: LivestockStatus,
    actor: Option<Uuid>,
) -> DbResult<Livestock> {
    sqlx::query_as::<_, Livestock>(
        r#"
        UPDATE livestock SET status = $2, updated_by = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .bind(actor)
    .fetch_one(conn)
    .await
    .map_err(DbError::from)
}

#[async_trait]
impl LivestockRepository for PgLivestockRepository {
    async fn create(&self, req: CreateLivestockRequest, actor: Option<Uuid>) -> DbResult<Livestock> {
        let mut tx = self.pool.begin().await?;

        ensure_reference(&mut tx, "species", "Species", req.species_id).await?;
        if let Some(barn_id) = req.barn_id {
            ensure_reference(&mut tx, "barns", "Barn", barn_id).await?;
        }

        let code = match normalize(req.inspection_code.clone()) {
            Some(code) => code,
            None => allocate_next_in(&mut tx, req.species_id, self.code_width).await?.code,
        };

        let livestock = sqlx::query_as::<_, Livestock>(
            r#"
            INSERT INTO livestock
                (inspection_code, species_id, barn_id, status, gender, color, weight_kg,
                 date_of_birth, origin, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING *
            "#,
        )
        .bind(&code)
        .bind(req.species_id)
        .bind(req.barn_id)
        .bind(req.initial_status().as_str())
        .bind(req.gender.as_str())
        .bind(normalize(req.color))
        .bind(req.weight_kg)
        .bind(req.date_of_birth)
        .bind(normalize(req.origin))
        .bind(actor)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify(e, "Livestock", &code))?;

        tx.commit().await?;
        Ok(livestock)
    }

    async fn get(&self, id: Uuid) -> DbResult<Livestock> {
        sqlx::query_as::<_, Livestock>("SELECT * FROM livestock WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Livestock", id))
    }

    async fn get_by_code(&self, code: &str) -> DbResult<Livestock> {
        sqlx::query_as::<_, Livestock>("SELECT * FROM livestock WHERE inspection_code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Livestock", code))
    }

    async fn list(&self, filter: LivestockFilter) -> DbResult<Paginated<Livestock>> {
        let page = filter.page_request();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM livestock");
        push_filters(&mut count, &filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM livestock");
        push_filters(&mut query, &filter);
        query
            .push(" ORDER BY inspection_code LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = query.build_query_as::<Livestock>().fetch_all(&self.pool).await?;

        Ok(Paginated::new(items, &page, total))
    }

    async fn update(
        &self,
        id: Uuid,
        req: UpdateLivestockRequest,
        actor: Option<Uuid>,
    ) -> DbResult<Livestock> {
        let mut tx = self.pool.begin().await?;
        if let Some(barn_id) = req.barn_id {
            ensure_reference(&mut tx, "barns", "Barn", barn_id).await?;
        }

        let livestock = sqlx::query_as::<_, Livestock>(
            r#"
            UPDATE livestock
            SET barn_id = $2, color = $3, weight_kg = $4, date_of_birth = $5, origin = $6,
                updated_by = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(req.barn_id)
        .bind(normalize(req.color))
        .bind(req.weight_kg)
        .bind(req.date_of_birth)
        .bind(normalize(req.origin))
        .bind(actor)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Livestock", id))?;

        tx.commit().await?;
        Ok(livestock)
    }

    async fn change_status(
        &self,
        id: Uuid,
        status: LivestockStatus,
        actor: Option<Uuid>,
    ) -> DbResult<Livestock> {
        let mut tx = self.pool.begin().await?;
        let current = lock_livestock(&mut tx, id).await?;
        ensure_transition("livestock", current.status, status, "change status of")?;
        let updated = set_livestock_status(&mut tx, id, status, actor).await?;
        tx.commit().await?;

        tracing::info!(
            livestock_id = %id,
            from = %current.status,
            to = %status,
            "Livestock status changed"
        );
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        lock_livestock(&mut tx, id).await?;

        let referenced: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM batch_import_details WHERE livestock_id = $1)
                OR EXISTS(SELECT 1 FROM batch_export_details WHERE livestock_id = $1)
                OR EXISTS(SELECT 1 FROM batch_vaccination_details WHERE livestock_id = $1)
                OR EXISTS(SELECT 1 FROM medical_records WHERE livestock_id = $1)
                OR EXISTS(SELECT 1 FROM insurance_requests
                          WHERE livestock_id = $1 OR replacement_livestock_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if referenced {
            return Err(DbError::conflict(
                "Livestock belongs to a batch or medical record and cannot be deleted",
            ));
        }

        sqlx::query("DELETE FROM livestock WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn vaccination_history(&self, id: Uuid) -> DbResult<Vec<VaccinationHistoryEntry>> {
        self.get(id).await?;
        sqlx::query_as::<_, VaccinationHistoryEntry>(
            r#"
            SELECT bv.id AS batch_vaccination_id, bv.name AS batch_name,
                   m.id AS medicine_id, m.name AS medicine_name, d.vaccinated_at
            FROM batch_vaccination_details d
            JOIN batch_vaccinations bv ON bv.id = d.batch_vaccination_id
            JOIN medicines m ON m.id = bv.medicine_id
            WHERE d.livestock_id = $1
            ORDER BY d.vaccinated_at DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)
    }

    async fn summary(&self) -> DbResult<LivestockSummary> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM livestock GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let counts = rows
            .into_iter()
            .filter_map(|(status, count)| status.parse::<LivestockStatus>().ok().map(|s| (s, count)));
        Ok(LivestockSummary::from_counts(counts))
    }
}
