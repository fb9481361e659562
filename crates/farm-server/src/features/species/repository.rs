use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{CreateSpeciesRequest, Species, SpeciesFilter, UpdateSpeciesRequest};
use crate::db::{classify, contains_pattern, DbError, DbResult};
use crate::features::shared::Paginated;

#[async_trait]
pub trait SpeciesRepository: Send + Sync {
    async fn create(&self, req: CreateSpeciesRequest, actor: Option<Uuid>) -> DbResult<Species>;
    async fn get(&self, id: Uuid) -> DbResult<Species>;
    async fn list(&self, filter: SpeciesFilter) -> DbResult<Paginated<Species>>;
    async fn update(
        &self,
        id: Uuid,
        req: UpdateSpeciesRequest,
        actor: Option<Uuid>,
    ) -> DbResult<Species>;
    /// Fails with a conflict while livestock of the species exist
    async fn delete(&self, id: Uuid) -> DbResult<()>;
}

pub struct PgSpeciesRepository {
    pool: PgPool,
}

impl PgSpeciesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &SpeciesFilter) {
    qb.push(" WHERE TRUE");
    if let Some(name) = &filter.name {
        qb.push(" AND name ILIKE ").push_bind(contains_pattern(name));
    }
    if let Some(species_type) = filter.species_type {
        qb.push(" AND species_type = ").push_bind(species_type.as_str());
    }
}

#[async_trait]
impl SpeciesRepository for PgSpeciesRepository {
    async fn create(&self, req: CreateSpeciesRequest, actor: Option<Uuid>) -> DbResult<Species> {
        let name = req.name.trim().to_string();
        sqlx::query_as::<_, Species>(
            r#"
            INSERT INTO species (name, description, species_type, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING *
            "#,
        )
        .bind(&name)
        .bind(&req.description)
        .bind(req.species_type.as_str())
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "Species", &name))
    }

    async fn get(&self, id: Uuid) -> DbResult<Species> {
        sqlx::query_as::<_, Species>("SELECT * FROM species WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Species", id))
    }

    async fn list(&self, filter: SpeciesFilter) -> DbResult<Paginated<Species>> {
        let page = filter.page_request();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM species");
        push_filters(&mut count, &filter);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM species");
        push_filters(&mut query, &filter);
        query
            .push(" ORDER BY name LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = query.build_query_as::<Species>().fetch_all(&self.pool).await?;

        Ok(Paginated::new(items, &page, total))
    }

    async fn update(
        &self,
        id: Uuid,
        req: UpdateSpeciesRequest,
        actor: Option<Uuid>,
    ) -> DbResult<Species> {
        let name = req.name.trim().to_string();
        sqlx::query_as::<_, Species>(
            r#"
            UPDATE species
            SET name = $2, description = $3, species_type = $4,
                updated_by = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&name)
        .bind(&req.description)
        .bind(req.species_type.as_str())
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, "Species", &name))?
        .ok_or_else(|| DbError::not_found("Species", id))
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let in_use: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM livestock WHERE species_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if in_use {
            return Err(DbError::conflict("Species is still referenced by livestock"));
        }

        let result = sqlx::query("DELETE FROM species WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "Species", id))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Species", id));
        }
        Ok(())
    }
}
