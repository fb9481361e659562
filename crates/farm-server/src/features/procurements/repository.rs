use async_trait::async_trait;
use chrono::Utc;
use farm_common::types::ProcurementStatus;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{
    ProcurementDetail, ProcurementDetailRequest, ProcurementFilter, ProcurementPackage,
    ProcurementRequest, ProcurementWithDetails,
};
use crate::db::{classify, contains_pattern, missing_reference, DbError, DbResult};
use crate::features::shared::{normalize, Paginated};

#[async_trait]
pub trait ProcurementRepository: Send + Sync {
    async fn create(
        &self,
        req: ProcurementRequest,
        actor: Option<Uuid>,
    ) -> DbResult<ProcurementWithDetails>;
    async fn get(&self, id: Uuid) -> DbResult<ProcurementWithDetails>;
    async fn list(&self, filter: ProcurementFilter) -> DbResult<Paginated<ProcurementPackage>>;
    /// Replaces the details of an open package
    async fn update(
        &self,
        id: Uuid,
        req: ProcurementRequest,
        actor: Option<Uuid>,
    ) -> DbResult<ProcurementWithDetails>;
    async fn award(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<ProcurementPackage>;
    async fn close(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<ProcurementPackage>;
    async fn cancel(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<ProcurementPackage>;
    async fn delete(&self, id: Uuid) -> DbResult<()>;
}

pub struct PgProcurementRepository {
    pool: PgPool,
}

impl PgProcurementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn transition(
        &self,
        id: Uuid,
        to: ProcurementStatus,
        action: &'static str,
        actor: Option<Uuid>,
    ) -> DbResult<ProcurementPackage> {
        let mut tx = self.pool.begin().await?;
        let mut package = lock_package(&mut tx, id).await?;
        package.transition(to, action, Utc::now())?;

        let package = sqlx::query_as::<_, ProcurementPackage>(
            r#"
            UPDATE procurement_packages
            SET status = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(package.status.as_str())
        .bind(actor)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(procurement_id = %id, status = %to, "Procurement status changed");
        Ok(package)
    }
}

async fn lock_package(conn: &mut PgConnection, id: Uuid) -> DbResult<ProcurementPackage> {
    sqlx::query_as::<_, ProcurementPackage>(
        "SELECT * FROM procurement_packages WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| DbError::not_found("Procurement package", id))
}

async fn load_details(conn: &mut PgConnection, id: Uuid) -> DbResult<Vec<ProcurementDetail>> {
    sqlx::query_as::<_, ProcurementDetail>(
        "SELECT * FROM procurement_details WHERE procurement_package_id = $1 ORDER BY id",
    )
    .bind(id)
    .fetch_all(conn)
    .await
    .map_err(DbError::from)
}

async fn replace_details(
    conn: &mut PgConnection,
    id: Uuid,
    details: &[ProcurementDetailRequest],
) -> DbResult<()> {
    let species_ids: Vec<Uuid> = details.iter().map(|d| d.species_id).collect();
    let known: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM species WHERE id = ANY($1)")
        .bind(&species_ids)
        .fetch_all(&mut *conn)
        .await?;
    if let Some(missing) = species_ids.iter().find(|id| !known.contains(id)) {
        return Err(missing_reference("Species", missing));
    }

    sqlx::query("DELETE FROM procurement_details WHERE procurement_package_id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    let mut insert = QueryBuilder::<Postgres>::new(
        "INSERT INTO procurement_details \
         (procurement_package_id, species_id, required_quantity, min_weight_kg, max_weight_kg, description) ",
    );
    insert.push_values(details, |mut row, detail| {
        row.push_bind(id)
            .push_bind(detail.species_id)
            .push_bind(detail.required_quantity)
            .push_bind(detail.min_weight_kg)
            .push_bind(detail.max_weight_kg)
            .push_bind(detail.description.clone());
    });
    insert.build().execute(&mut *conn).await?;
    Ok(())
}

/// Filters on the effective status, so an expired OPEN row matches EXPIRED
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProcurementFilter) {
    qb.push(" WHERE TRUE");
    match filter.status {
        Some(ProcurementStatus::Open) => {
            qb.push(" AND status = 'OPEN' AND expired_at >= NOW()");
        },
        Some(ProcurementStatus::Expired) => {
            qb.push(" AND (status = 'EXPIRED' OR (status = 'OPEN' AND expired_at < NOW()))");
        },
        Some(other) => {
            qb.push(" AND status = ").push_bind(other.as_str());
        },
        None => {},
    }
    if let Some(keyword) = &filter.keyword {
        let pattern = contains_pattern(keyword);
        qb.push(" AND (code ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR owner ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl ProcurementRepository for PgProcurementRepository {
    async fn create(
        &self,
        req: ProcurementRequest,
        actor: Option<Uuid>,
    ) -> DbResult<ProcurementWithDetails> {
        let code = req.code.trim().to_string();
        let mut tx = self.pool.begin().await?;

        let package = sqlx::query_as::<_, ProcurementPackage>(
            r#"
            INSERT INTO procurement_packages
                (code, name, description, owner, expired_at, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(&code)
        .bind(req.name.trim())
        .bind(normalize(req.description.clone()))
        .bind(req.owner.trim())
        .bind(req.expired_at)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify(e, "Procurement package", &code))?;

        replace_details(&mut tx, package.id, &req.details).await?;
        let details = load_details(&mut tx, package.id).await?;
        tx.commit().await?;

        tracing::info!(procurement_id = %package.id, code = %package.code, details = details.len(), "Procurement package created");
        Ok(ProcurementWithDetails { package, details })
    }

    async fn get(&self, id: Uuid) -> DbResult<ProcurementWithDetails> {
        let mut conn = self.pool.acquire().await?;
        let package = sqlx::query_as::<_, ProcurementPackage>(
            "SELECT * FROM procurement_packages WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Procurement package", id))?;
        let details = load_details(&mut conn, id).await?;
        Ok(ProcurementWithDetails {
            package: package.resolve_expiry(Utc::now()),
            details,
        })
    }

    async fn list(&self, filter: ProcurementFilter) -> DbResult<Paginated<ProcurementPackage>> {
        let page = filter.page_request();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM procurement_packages");
        push_filters(&mut count, &filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM procurement_packages");
        push_filters(&mut query, &filter);
        query
            .push(" ORDER BY expired_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let now = Utc::now();
        let items = query
            .build_query_as::<ProcurementPackage>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|p| p.resolve_expiry(now))
            .collect();

        Ok(Paginated::new(items, &page, total))
    }

    async fn update(
        &self,
        id: Uuid,
        req: ProcurementRequest,
        actor: Option<Uuid>,
    ) -> DbResult<ProcurementWithDetails> {
        let code = req.code.trim().to_string();
        let mut tx = self.pool.begin().await?;
        lock_package(&mut tx, id).await?.ensure_editable(Utc::now())?;

        let package = sqlx::query_as::<_, ProcurementPackage>(
            r#"
            UPDATE procurement_packages
            SET code = $2, name = $3, description = $4, owner = $5, expired_at = $6,
                updated_by = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&code)
        .bind(req.name.trim())
        .bind(normalize(req.description.clone()))
        .bind(req.owner.trim())
        .bind(req.expired_at)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify(e, "Procurement package", &code))?;

        replace_details(&mut tx, id, &req.details).await?;
        let details = load_details(&mut tx, id).await?;
        tx.commit().await?;
        Ok(ProcurementWithDetails { package, details })
    }

    async fn award(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<ProcurementPackage> {
        self.transition(id, ProcurementStatus::Awarded, "award", actor)
            .await
    }

    async fn close(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<ProcurementPackage> {
        self.transition(id, ProcurementStatus::Closed, "close", actor)
            .await
    }

    async fn cancel(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<ProcurementPackage> {
        self.transition(id, ProcurementStatus::Cancelled, "cancel", actor)
            .await
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        lock_package(&mut tx, id).await?.ensure_deletable(Utc::now())?;

        let ordered: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM orders WHERE procurement_package_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if ordered {
            return Err(DbError::conflict("Procurement package is referenced by orders"));
        }

        // details cascade
        sqlx::query("DELETE FROM procurement_packages WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
