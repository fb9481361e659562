use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::api::response::AppError;
use crate::features::shared::{PageRequest, Validator, MAX_NAME_LENGTH};

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRequest {
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role_id: Uuid,
}

impl UserRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let username = self.username.trim();
        let mut v = Validator::new();
        v.name("username", username, MAX_USERNAME_LENGTH)
            .check(
                username.chars().count() >= MIN_USERNAME_LENGTH,
                "username",
                format!("username must be at least {} characters", MIN_USERNAME_LENGTH),
            )
            .check(
                !username.chars().any(char::is_whitespace),
                "username",
                "username must not contain whitespace",
            )
            .email("email", &self.email)
            .name("full_name", &self.full_name, MAX_NAME_LENGTH)
            .text("phone", self.phone.as_deref(), 32);
        v.finish()
    }

    pub fn username_key(&self) -> String {
        self.username.trim().to_string()
    }

    /// Emails compare case-insensitively
    pub fn email_key(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserFilter {
    /// Matches username, full name or email
    pub keyword: Option<String>,
    pub role_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl UserFilter {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }

    pub fn matches(&self, user: &User) -> bool {
        let keyword_ok = self.keyword.as_deref().map_or(true, |kw| {
            let kw = kw.to_lowercase();
            [&user.username, &user.full_name, &user.email]
                .iter()
                .any(|field| field.to_lowercase().contains(&kw))
        });
        keyword_ok
            && self.role_id.map_or(true, |r| r == user.role_id)
            && self.is_active.map_or(true, |a| a == user.is_active)
    }
}
