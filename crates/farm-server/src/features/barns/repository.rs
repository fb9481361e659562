use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{Barn, BarnFilter, BarnRequest};
use crate::db::{classify, contains_pattern, DbError, DbResult};
use crate::features::shared::Paginated;

#[async_trait]
pub trait BarnRepository: Send + Sync {
    async fn create(&self, req: BarnRequest, actor: Option<Uuid>) -> DbResult<Barn>;
    async fn get(&self, id: Uuid) -> DbResult<Barn>;
    async fn list(&self, filter: BarnFilter) -> DbResult<Paginated<Barn>>;
    async fn update(&self, id: Uuid, req: BarnRequest, actor: Option<Uuid>) -> DbResult<Barn>;
    /// Fails with a conflict while livestock are housed in the barn
    async fn delete(&self, id: Uuid) -> DbResult<()>;
}

pub struct PgBarnRepository {
    pool: PgPool,
}

impl PgBarnRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &BarnFilter) {
    qb.push(" WHERE TRUE");
    if let Some(name) = &filter.name {
        qb.push(" AND name ILIKE ").push_bind(contains_pattern(name));
    }
}

#[async_trait]
impl BarnRepository for PgBarnRepository {
    async fn create(&self, req: BarnRequest, actor: Option<Uuid>) -> DbResult<Barn> {
        let name = req.name.trim().to_string();
        sqlx::query_as::<_, Barn>(
            r#"
            INSERT INTO barns (name, address, owner, capacity, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *
            "#,
        )
        .bind(&name)
        .bind(req.address.trim())
        .bind(req.owner.trim())
        .bind(req.capacity)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "Barn", &name))
    }

    async fn get(&self, id: Uuid) -> DbResult<Barn> {
        sqlx::query_as::<_, Barn>("SELECT * FROM barns WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Barn", id))
    }

    async fn list(&self, filter: BarnFilter) -> DbResult<Paginated<Barn>> {
        let page = filter.page_request();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM barns");
        push_filters(&mut count, &filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM barns");
        push_filters(&mut query, &filter);
        query
            .push(" ORDER BY name LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = query.build_query_as::<Barn>().fetch_all(&self.pool).await?;

        Ok(Paginated::new(items, &page, total))
    }

    async fn update(&self, id: Uuid, req: BarnRequest, actor: Option<Uuid>) -> DbResult<Barn> {
        let name = req.name.trim().to_string();
        sqlx::query_as::<_, Barn>(
            r#"
            UPDATE barns
            SET name = $2, address = $3, owner = $4, capacity = $5,
                updated_by = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&name)
        .bind(req.address.trim())
        .bind(req.owner.trim())
        .bind(req.capacity)
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, "Barn", &name))?
        .ok_or_else(|| DbError::not_found("Barn", id))
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let housed: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM livestock WHERE barn_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if housed {
            return Err(DbError::conflict("Barn still houses livestock"));
        }

        let result = sqlx::query("DELETE FROM barns WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "Barn", id))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Barn", id));
        }
        Ok(())
    }
}
