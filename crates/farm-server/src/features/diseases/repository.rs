use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{Disease, DiseaseFilter, DiseaseRequest};
use crate::db::{classify, contains_pattern, DbError, DbResult};
use crate::features::shared::{normalize, Paginated};

#[async_trait]
pub trait DiseaseRepository: Send + Sync {
    async fn create(&self, req: DiseaseRequest, actor: Option<Uuid>) -> DbResult<Disease>;
    async fn get(&self, id: Uuid) -> DbResult<Disease>;
    async fn list(&self, filter: DiseaseFilter) -> DbResult<Paginated<Disease>>;
    async fn update(&self, id: Uuid, req: DiseaseRequest, actor: Option<Uuid>)
        -> DbResult<Disease>;
    /// Fails while a medicine or medical record refers to the disease
    async fn delete(&self, id: Uuid) -> DbResult<()>;
}

pub struct PgDiseaseRepository {
    pool: PgPool,
}

impl PgDiseaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &DiseaseFilter) {
    qb.push(" WHERE TRUE");
    if let Some(name) = &filter.name {
        qb.push(" AND name ILIKE ").push_bind(contains_pattern(name));
    }
    if let Some(disease_type) = filter.disease_type {
        qb.push(" AND disease_type = ").push_bind(disease_type.as_str());
    }
}

#[async_trait]
impl DiseaseRepository for PgDiseaseRepository {
    async fn create(&self, req: DiseaseRequest, actor: Option<Uuid>) -> DbResult<Disease> {
        let name = req.name.trim().to_string();
        sqlx::query_as::<_, Disease>(
            r#"
            INSERT INTO diseases (name, symptom, description, disease_type, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *
            "#,
        )
        .bind(&name)
        .bind(normalize(req.symptom))
        .bind(normalize(req.description))
        .bind(req.disease_type.as_str())
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "Disease", &name))
    }

    async fn get(&self, id: Uuid) -> DbResult<Disease> {
        sqlx::query_as::<_, Disease>("SELECT * FROM diseases WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Disease", id))
    }

    async fn list(&self, filter: DiseaseFilter) -> DbResult<Paginated<Disease>> {
        let page = filter.page_request();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM diseases");
        push_filters(&mut count, &filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM diseases");
        push_filters(&mut query, &filter);
        query
            .push(" ORDER BY name LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = query.build_query_as::<Disease>().fetch_all(&self.pool).await?;

        Ok(Paginated::new(items, &page, total))
    }

    async fn update(
        &self,
        id: Uuid,
        req: DiseaseRequest,
        actor: Option<Uuid>,
    ) -> DbResult<Disease> {
        let name = req.name.trim().to_string();
        sqlx::query_as::<_, Disease>(
            r#"
            UPDATE diseases
            SET name = $2, symptom = $3, description = $4, disease_type = $5,
                updated_by = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&name)
        .bind(normalize(req.symptom))
        .bind(normalize(req.description))
        .bind(req.disease_type.as_str())
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, "Disease", &name))?
        .ok_or_else(|| DbError::not_found("Disease", id))
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let referenced: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM medicine_diseases WHERE disease_id = $1)
                OR EXISTS(SELECT 1 FROM medical_records WHERE disease_id = $1)
                OR EXISTS(SELECT 1 FROM insurance_requests WHERE disease_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if referenced {
            return Err(DbError::conflict(
                "Disease is referenced by medicines or medical records",
            ));
        }

        let deleted = sqlx::query("DELETE FROM diseases WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(DbError::not_found("Disease", id));
        }
        tx.commit().await?;
        Ok(())
    }
}
