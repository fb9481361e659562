use chrono::{DateTime, Utc};
use farm_common::types::OrderStatus;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::api::response::AppError;
use crate::db::{ensure_transition, DbResult};
use crate::features::shared::{PageRequest, Validator, MAX_NAME_LENGTH};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub code: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub procurement_package_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub total_amount: f64,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

impl Order {
    pub fn transition(&mut self, to: OrderStatus, action: &'static str) -> DbResult<()> {
        ensure_transition("order", self.status, to, action)?;
        self.status = to;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderLine {
    pub id: Uuid,
    pub order_id: Uuid,
    pub species_id: Uuid,
    pub quantity: i32,
    pub unit_price: f64,
}

impl OrderLine {
    pub fn amount(&self) -> f64 {
        f64::from(self.quantity) * self.unit_price
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithLines {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub species_id: Uuid,
    pub quantity: i32,
    pub unit_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Generated when omitted
    #[serde(default)]
    pub code: Option<String>,
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub procurement_package_id: Option<Uuid>,
    pub lines: Vec<OrderLineRequest>,
}

impl OrderRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.name("customer_name", &self.customer_name, MAX_NAME_LENGTH)
            .text("customer_phone", self.customer_phone.as_deref(), 32)
            .check(!self.lines.is_empty(), "lines", "at least one line is required");
        if let Some(code) = &self.code {
            v.name("code", code, 50);
        }
        for (i, line) in self.lines.iter().enumerate() {
            let field = format!("lines[{}]", i);
            v.check(line.quantity > 0, &field, "quantity must be greater than 0")
                .check(line.unit_price >= 0.0, &field, "unit_price must not be negative");
        }
        v.finish()
    }

    /// Sum of quantity times unit price over all lines
    pub fn total_amount(&self) -> f64 {
        self.lines
            .iter()
            .map(|l| f64::from(l.quantity) * l.unit_price)
            .sum()
    }

    pub fn code_or_generate(&self, now: DateTime<Utc>) -> String {
        match self.code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => generate_order_code(now),
        }
    }
}

/// `ORD-YYYYMMDD-XXXXXX`
pub fn generate_order_code(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("ORD-{}-{}", now.format("%Y%m%d"), suffix[..6].to_uppercase())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    /// Matches code or customer name
    pub keyword: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl OrderFilter {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }

    pub fn matches(&self, order: &Order) -> bool {
        let keyword_ok = self.keyword.as_deref().map_or(true, |kw| {
            let kw = kw.to_lowercase();
            order.code.to_lowercase().contains(&kw)
                || order.customer_name.to_lowercase().contains(&kw)
        });
        keyword_ok && self.status.map_or(true, |s| s == order.status)
    }
}
