use chrono::{DateTime, Utc};
use farm_common::types::is_known_permission;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::api::response::AppError;
use crate::features::shared::{PageRequest, Validator, MAX_NAME_LENGTH, MAX_TEXT_LENGTH};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

impl Role {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl RoleRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.name("name", &self.name, MAX_NAME_LENGTH)
            .text("description", self.description.as_deref(), MAX_TEXT_LENGTH);
        for (i, permission) in self.permissions.iter().enumerate() {
            v.check(
                is_known_permission(permission.trim()),
                &format!("permissions[{}]", i),
                format!("Unknown permission '{}'", permission),
            );
        }
        v.finish()
    }

    /// Trimmed, deduplicated, in request order
    pub fn normalized_permissions(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.permissions.len());
        for permission in &self.permissions {
            let permission = permission.trim();
            if !out.iter().any(|p| p == permission) {
                out.push(permission.to_string());
            }
        }
        out
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleFilter {
    pub name: Option<String>,
    pub permission: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl RoleFilter {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }

    pub fn matches(&self, role: &Role) -> bool {
        let name_ok = self.name.as_deref().map_or(true, |name| {
            role.name.to_lowercase().contains(&name.to_lowercase())
        });
        name_ok && self.permission.as_deref().map_or(true, |p| role.has_permission(p))
    }
}
