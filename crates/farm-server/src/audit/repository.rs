use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::models::{AuditEntry, AuditFilter, CreateAuditEntry};
use crate::db::DbResult;
use crate::features::shared::Paginated;

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn record(&self, entry: CreateAuditEntry) -> DbResult<AuditEntry>;
    async fn list(&self, filter: AuditFilter) -> DbResult<Paginated<AuditEntry>>;
}

pub struct PgAuditRepository {
    pool: PgPool,
}

impl PgAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &AuditFilter) {
    qb.push(" WHERE TRUE");
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(action) = filter.action {
        qb.push(" AND action = ").push_bind(action.as_str());
    }
    if let Some(resource_type) = filter.resource_type {
        qb.push(" AND resource_type = ").push_bind(resource_type.as_str());
    }
    if let Some(resource_id) = filter.resource_id {
        qb.push(" AND resource_id = ").push_bind(resource_id);
    }
    if let Some(from) = filter.from {
        qb.push(" AND timestamp >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND timestamp <= ").push_bind(to);
    }
}

#[async_trait]
impl AuditRepository for PgAuditRepository {
    async fn record(&self, entry: CreateAuditEntry) -> DbResult<AuditEntry> {
        let entry = sqlx::query_as::<_, AuditEntry>(
            r#"
            INSERT INTO audit_log
                (user_id, action, resource_type, resource_id, changes, metadata,
                 ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.action.as_str())
        .bind(entry.resource_type.as_str())
        .bind(entry.resource_id)
        .bind(entry.changes)
        .bind(entry.metadata)
        .bind(entry.ip_address)
        .bind(entry.user_agent)
        .fetch_one(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn list(&self, filter: AuditFilter) -> DbResult<Paginated<AuditEntry>> {
        let page = filter.page_request();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM audit_log");
        push_filters(&mut count, &filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM audit_log");
        push_filters(&mut query, &filter);
        query
            .push(" ORDER BY timestamp DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = query.build_query_as::<AuditEntry>().fetch_all(&self.pool).await?;

        Ok(Paginated::new(items, &page, total))
    }
}
