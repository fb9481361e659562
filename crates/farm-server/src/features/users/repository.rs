use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{User, UserFilter, UserRequest};
use crate::db::{classify, contains_pattern, ensure_reference, DbError, DbResult};
use crate::features::shared::{normalize, Paginated};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, req: UserRequest, actor: Option<Uuid>) -> DbResult<User>;
    async fn get(&self, id: Uuid) -> DbResult<User>;
    async fn list(&self, filter: UserFilter) -> DbResult<Paginated<User>>;
    async fn update(&self, id: Uuid, req: UserRequest, actor: Option<Uuid>) -> DbResult<User>;
    async fn set_active(&self, id: Uuid, active: bool, actor: Option<Uuid>) -> DbResult<User>;
    async fn delete(&self, id: Uuid) -> DbResult<()>;
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Name the column that collided
fn classify_user(err: sqlx::Error, req: &UserRequest) -> DbError {
    let email_taken = matches!(
        &err,
        sqlx::Error::Database(db_err) if db_err.constraint() == Some("users_email_key")
    );
    if email_taken {
        classify(err, "User email", req.email_key())
    } else {
        classify(err, "User", req.username_key())
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    qb.push(" WHERE TRUE");
    if let Some(keyword) = &filter.keyword {
        let pattern = contains_pattern(keyword);
        qb.push(" AND (username ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR full_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(role_id) = filter.role_id {
        qb.push(" AND role_id = ").push_bind(role_id);
    }
    if let Some(is_active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, req: UserRequest, actor: Option<Uuid>) -> DbResult<User> {
        let mut tx = self.pool.begin().await?;
        ensure_reference(&mut tx, "roles", "Role", req.role_id).await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, full_name, phone, role_id, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(req.username_key())
        .bind(req.email_key())
        .bind(req.full_name.trim())
        .bind(normalize(req.phone.clone()))
        .bind(req.role_id)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify_user(e, &req))?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User created");
        Ok(user)
    }

    async fn get(&self, id: Uuid) -> DbResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    async fn list(&self, filter: UserFilter) -> DbResult<Paginated<User>> {
        let page = filter.page_request();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_filters(&mut count, &filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM users");
        push_filters(&mut query, &filter);
        query
            .push(" ORDER BY username LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = query.build_query_as::<User>().fetch_all(&self.pool).await?;

        Ok(Paginated::new(items, &page, total))
    }

    async fn update(&self, id: Uuid, req: UserRequest, actor: Option<Uuid>) -> DbResult<User> {
        let mut tx = self.pool.begin().await?;
        ensure_reference(&mut tx, "roles", "Role", req.role_id).await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $2, email = $3, full_name = $4, phone = $5, role_id = $6,
                updated_by = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(req.username_key())
        .bind(req.email_key())
        .bind(req.full_name.trim())
        .bind(normalize(req.phone.clone()))
        .bind(req.role_id)
        .bind(actor)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| classify_user(e, &req))?
        .ok_or_else(|| DbError::not_found("User", id))?;
        tx.commit().await?;

        Ok(user)
    }

    async fn set_active(&self, id: Uuid, active: bool, actor: Option<Uuid>) -> DbResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET is_active = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(active)
        .bind(actor)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("User", id))?;

        tracing::info!(user_id = %id, active, "User activation changed");
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }
        Ok(())
    }
}
