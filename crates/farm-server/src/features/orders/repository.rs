use async_trait::async_trait;
use chrono::Utc;
use farm_common::types::{OrderStatus, ProcurementStatus};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{Order, OrderFilter, OrderLine, OrderRequest, OrderWithLines};
use crate::db::{classify, contains_pattern, missing_reference, DbError, DbResult};
use crate::features::procurements::ProcurementPackage;
use crate::features::shared::{normalize, Paginated};

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create(&self, req: OrderRequest, actor: Option<Uuid>) -> DbResult<OrderWithLines>;
    async fn get(&self, id: Uuid) -> DbResult<OrderWithLines>;
    async fn list(&self, filter: OrderFilter) -> DbResult<Paginated<Order>>;
    async fn confirm(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<Order>;
    async fn complete(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<Order>;
    async fn cancel(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<Order>;
}

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn transition(
        &self,
        id: Uuid,
        to: OrderStatus,
        action: &'static str,
        actor: Option<Uuid>,
    ) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;
        let mut order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;
        order.transition(to, action)?;

        let order = sqlx::query_as::<_, Order>(
            "UPDATE orders SET status = $2, updated_by = $3, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(order.status.as_str())
        .bind(actor)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(order_id = %id, code = %order.code, status = %to, "Order status changed");
        Ok(order)
    }
}

/// Orders may only be placed against an awarded package
async fn ensure_awarded(conn: &mut PgConnection, package_id: Uuid) -> DbResult<()> {
    let package = sqlx::query_as::<_, ProcurementPackage>(
        "SELECT * FROM procurement_packages WHERE id = $1",
    )
    .bind(package_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| missing_reference("Procurement package", package_id))?;

    let status = package.effective_status(Utc::now());
    if status == ProcurementStatus::Awarded {
        Ok(())
    } else {
        Err(DbError::validation(format!(
            "Procurement package '{}' is {} and cannot take orders",
            package.code, status
        )))
    }
}

async fn load_lines(conn: &mut PgConnection, id: Uuid) -> DbResult<Vec<OrderLine>> {
    sqlx::query_as::<_, OrderLine>("SELECT * FROM order_lines WHERE order_id = $1 ORDER BY id")
        .bind(id)
        .fetch_all(conn)
        .await
        .map_err(DbError::from)
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    qb.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(keyword) = &filter.keyword {
        let pattern = contains_pattern(keyword);
        qb.push(" AND (code ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR customer_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create(&self, req: OrderRequest, actor: Option<Uuid>) -> DbResult<OrderWithLines> {
        let code = req.code_or_generate(Utc::now());
        let total = req.total_amount();
        let mut tx = self.pool.begin().await?;

        if let Some(package_id) = req.procurement_package_id {
            ensure_awarded(&mut tx, package_id).await?;
        }

        let species_ids: Vec<Uuid> = req.lines.iter().map(|l| l.species_id).collect();
        let known: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM species WHERE id = ANY($1)")
            .bind(&species_ids)
            .fetch_all(&mut *tx)
            .await?;
        if let Some(missing) = species_ids.iter().find(|id| !known.contains(id)) {
            return Err(missing_reference("Species", missing));
        }

        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders
                (code, customer_name, customer_phone, procurement_package_id, total_amount,
                 created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(&code)
        .bind(req.customer_name.trim())
        .bind(normalize(req.customer_phone.clone()))
        .bind(req.procurement_package_id)
        .bind(total)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify(e, "Order", &code))?;

        let mut insert = QueryBuilder::<Postgres>::new(
            "INSERT INTO order_lines (order_id, species_id, quantity, unit_price) ",
        );
        insert.push_values(&req.lines, |mut row, line| {
            row.push_bind(order.id)
                .push_bind(line.species_id)
                .push_bind(line.quantity)
                .push_bind(line.unit_price);
        });
        insert.build().execute(&mut *tx).await?;

        let lines = load_lines(&mut tx, order.id).await?;
        tx.commit().await?;

        tracing::info!(order_id = %order.id, code = %order.code, total_amount = order.total_amount, "Order created");
        Ok(OrderWithLines { order, lines })
    }

    async fn get(&self, id: Uuid) -> DbResult<OrderWithLines> {
        let mut conn = self.pool.acquire().await?;
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;
        let lines = load_lines(&mut conn, id).await?;
        Ok(OrderWithLines { order, lines })
    }

    async fn list(&self, filter: OrderFilter) -> DbResult<Paginated<Order>> {
        let page = filter.page_request();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders");
        push_filters(&mut count, &filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM orders");
        push_filters(&mut query, &filter);
        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = query.build_query_as::<Order>().fetch_all(&self.pool).await?;

        Ok(Paginated::new(items, &page, total))
    }

    async fn confirm(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<Order> {
        self.transition(id, OrderStatus::Confirmed, "confirm", actor)
            .await
    }

    async fn complete(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<Order> {
        self.transition(id, OrderStatus::Completed, "complete", actor)
            .await
    }

    async fn cancel(&self, id: Uuid, actor: Option<Uuid>) -> DbResult<Order> {
        self.transition(id, OrderStatus::Cancelled, "cancel", actor)
            .await
    }
}
