use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{Medicine, MedicineFilter, MedicineRequest};
use crate::db::{classify, contains_pattern, missing_reference, DbError, DbResult};
use crate::features::shared::{normalize, Paginated};

#[async_trait]
pub trait MedicineRepository: Send + Sync {
    async fn create(&self, req: MedicineRequest, actor: Option<Uuid>) -> DbResult<Medicine>;
    async fn get(&self, id: Uuid) -> DbResult<Medicine>;
    async fn list(&self, filter: MedicineFilter) -> DbResult<Paginated<Medicine>>;
    async fn update(
        &self,
        id: Uuid,
        req: MedicineRequest,
        actor: Option<Uuid>,
    ) -> DbResult<Medicine>;
    /// Fails while a vaccination batch or medical record uses the medicine
    async fn delete(&self, id: Uuid) -> DbResult<()>;
}

pub struct PgMedicineRepository {
    pool: PgPool,
}

impl PgMedicineRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_MEDICINE: &str = r#"
    SELECT m.*,
           ARRAY(SELECT md.disease_id FROM medicine_diseases md
                 WHERE md.medicine_id = m.id ORDER BY md.disease_id) AS disease_ids
    FROM medicines m
"#;

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &MedicineFilter) {
    qb.push(" WHERE TRUE");
    if let Some(name) = &filter.name {
        qb.push(" AND m.name ILIKE ").push_bind(contains_pattern(name));
    }
    if let Some(medicine_type) = filter.medicine_type {
        qb.push(" AND m.medicine_type = ").push_bind(medicine_type.as_str());
    }
    if let Some(disease_id) = filter.disease_id {
        qb.push(
            " AND EXISTS(SELECT 1 FROM medicine_diseases f WHERE f.medicine_id = m.id AND f.disease_id = ",
        )
        .push_bind(disease_id)
        .push(")");
    }
}

pub(crate) async fn fetch_medicine(conn: &mut PgConnection, id: Uuid) -> DbResult<Medicine> {
    sqlx::query_as::<_, Medicine>(&format!("{} WHERE m.id = $1", SELECT_MEDICINE))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DbError::not_found("Medicine", id))
}

/// Replace the disease links of a medicine
async fn link_diseases(
    conn: &mut PgConnection,
    medicine_id: Uuid,
    disease_ids: &[Uuid],
) -> DbResult<()> {
    let known: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM diseases WHERE id = ANY($1)")
        .bind(disease_ids)
        .fetch_all(&mut *conn)
        .await?;
    if let Some(missing) = disease_ids.iter().find(|id| !known.contains(id)) {
        return Err(missing_reference("Disease", missing));
    }

    sqlx::query("DELETE FROM medicine_diseases WHERE medicine_id = $1")
        .bind(medicine_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query(
        "INSERT INTO medicine_diseases (medicine_id, disease_id) SELECT $1, UNNEST($2::uuid[])",
    )
    .bind(medicine_id)
    .bind(disease_ids)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[async_trait]
impl MedicineRepository for PgMedicineRepository {
    async fn create(&self, req: MedicineRequest, actor: Option<Uuid>) -> DbResult<Medicine> {
        let disease_ids = req.unique_disease_ids();
        let name = req.name.trim().to_string();
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO medicines (name, medicine_type, description, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id
            "#,
        )
        .bind(&name)
        .bind(req.medicine_type.as_str())
        .bind(normalize(req.description))
        .bind(actor)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify(e, "Medicine", &name))?;

        link_diseases(&mut tx, id, &disease_ids).await?;
        let medicine = fetch_medicine(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(medicine_id = %id, diseases = disease_ids.len(), "Medicine created");
        Ok(medicine)
    }

    async fn get(&self, id: Uuid) -> DbResult<Medicine> {
        let mut conn = self.pool.acquire().await?;
        fetch_medicine(&mut conn, id).await
    }

    async fn list(&self, filter: MedicineFilter) -> DbResult<Paginated<Medicine>> {
        let page = filter.page_request();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM medicines m");
        push_filters(&mut count, &filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(SELECT_MEDICINE);
        push_filters(&mut query, &filter);
        query
            .push(" ORDER BY m.name LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = query.build_query_as::<Medicine>().fetch_all(&self.pool).await?;

        Ok(Paginated::new(items, &page, total))
    }

    async fn update(
        &self,
        id: Uuid,
        req: MedicineRequest,
        actor: Option<Uuid>,
    ) -> DbResult<Medicine> {
        let disease_ids = req.unique_disease_ids();
        let name = req.name.trim().to_string();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE medicines
            SET name = $2, medicine_type = $3, description = $4,
                updated_by = $5, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&name)
        .bind(req.medicine_type.as_str())
        .bind(normalize(req.description))
        .bind(actor)
        .execute(&mut *tx)
        .await
        .map_err(|e| classify(e, "Medicine", &name))?;
        if updated.rows_affected() == 0 {
            return Err(DbError::not_found("Medicine", id));
        }

        link_diseases(&mut tx, id, &disease_ids).await?;
        let medicine = fetch_medicine(&mut tx, id).await?;
        tx.commit().await?;
        Ok(medicine)
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let referenced: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM batch_vaccinations WHERE medicine_id = $1)
                OR EXISTS(SELECT 1 FROM medical_records WHERE medicine_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if referenced {
            return Err(DbError::conflict(
                "Medicine is used by vaccination batches or medical records",
            ));
        }

        // links cascade
        let deleted = sqlx::query("DELETE FROM medicines WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(DbError::not_found("Medicine", id));
        }
        tx.commit().await?;
        Ok(())
    }
}
