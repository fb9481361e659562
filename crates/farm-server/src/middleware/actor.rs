//! Acting user of a request
//!
//! There is no authentication layer; callers identify themselves with the
//! `x-user-id` header. The value is written to `created_by` / `updated_by`
//! columns and to the audit log.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::api::response::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// User id taken from the `x-user-id` header, if any
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Actor(pub Option<Uuid>);

impl Actor {
    pub fn id(&self) -> Option<Uuid> {
        self.0
    }

    /// Parse the header value; blank means anonymous
    pub fn from_header(value: Option<&str>) -> Result<Self, AppError> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(Actor(None)),
            Some(raw) => Uuid::parse_str(raw).map(|id| Actor(Some(id))).map_err(|_| {
                AppError::BadRequest(format!("{} header must be a UUID", USER_ID_HEADER))
            }),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok());
        Actor::from_header(value)
    }
}
