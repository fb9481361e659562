use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{Role, RoleFilter, RoleRequest};
use crate::db::{classify, contains_pattern, DbError, DbResult};
use crate::features::shared::{normalize, Paginated};

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn create(&self, req: RoleRequest, actor: Option<Uuid>) -> DbResult<Role>;
    async fn get(&self, id: Uuid) -> DbResult<Role>;
    async fn list(&self, filter: RoleFilter) -> DbResult<Paginated<Role>>;
    async fn update(&self, id: Uuid, req: RoleRequest, actor: Option<Uuid>) -> DbResult<Role>;
    /// Fails while users hold the role
    async fn delete(&self, id: Uuid) -> DbResult<()>;
}

pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &RoleFilter) {
    qb.push(" WHERE TRUE");
    if let Some(name) = &filter.name {
        qb.push(" AND name ILIKE ").push_bind(contains_pattern(name));
    }
    if let Some(permission) = &filter.permission {
        qb.push(" AND ").push_bind(permission.clone()).push(" = ANY(permissions)");
    }
}

#[async_trait]
impl RoleRepository for PgRoleRepository {
    async fn create(&self, req: RoleRequest, actor: Option<Uuid>) -> DbResult<Role> {
        let name = req.name.trim().to_string();
        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (name, description, permissions, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING *
            "#,
        )
        .bind(&name)
        .bind(normalize(req.description.clone()))
        .bind(req.normalized_permissions())
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "Role", &name))?;

        tracing::info!(role_id = %role.id, name = %role.name, "Role created");
        Ok(role)
    }

    async fn get(&self, id: Uuid) -> DbResult<Role> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Role", id))
    }

    async fn list(&self, filter: RoleFilter) -> DbResult<Paginated<Role>> {
        let page = filter.page_request();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM roles");
        push_filters(&mut count, &filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM roles");
        push_filters(&mut query, &filter);
        query
            .push(" ORDER BY name LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = query.build_query_as::<Role>().fetch_all(&self.pool).await?;

        Ok(Paginated::new(items, &page, total))
    }

    async fn update(&self, id: Uuid, req: RoleRequest, actor: Option<Uuid>) -> DbResult<Role> {
        let name = req.name.trim().to_string();
        sqlx::query_as::<_, Role>(
            r#"
            UPDATE roles
            SET name = $2, description = $3, permissions = $4, updated_by = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&name)
        .bind(normalize(req.description.clone()))
        .bind(req.normalized_permissions())
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, "Role", &name))?
        .ok_or_else(|| DbError::not_found("Role", id))
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Role", id))?;

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if users > 0 {
            return Err(DbError::conflict(format!(
                "Role '{}' is still assigned to {} user(s)",
                role.name, users
            )));
        }

        sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(role_id = %id, name = %role.name, "Role deleted");
        Ok(())
    }
}
