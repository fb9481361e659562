//! Audit logging middleware for write requests

use std::{
    future::Future,
    net::SocketAddr,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Request},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::Value as JsonValue;
use tower::{Layer, Service};
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::models::{AuditAction, CreateAuditEntry, ResourceType};
use super::repository::AuditRepository;
use crate::api::response::ApiResponse;
use crate::middleware::USER_ID_HEADER;

const API_PREFIX: &str = "/api/v1";

/// Largest write body the layer buffers; same as axum's default body limit
pub const MAX_AUDITED_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Audit logging layer
#[derive(Clone)]
pub struct AuditLayer {
    repo: Arc<dyn AuditRepository>,
}

impl AuditLayer {
    pub fn new(repo: Arc<dyn AuditRepository>) -> Self {
        Self { repo }
    }
}

impl<S> Layer<S> for AuditLayer {
    type Service = AuditMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuditMiddleware {
            inner,
            repo: self.repo.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuditMiddleware<S> {
    inner: S,
    repo: Arc<dyn AuditRepository>,
}

impl<S> Service<Request> for AuditMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let mut inner = self.inner.clone();
        let repo = self.repo.clone();

        Box::pin(async move {
            let method = request.method().clone();
            let uri = request.uri().clone();

            if !should_audit(&method, uri.path()) {
                return inner.call(request).await;
            }

            let headers = request.headers();
            let ip_address = request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip().to_string());
            let user_agent = headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let user_id = headers
                .get(USER_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| Uuid::parse_str(s.trim()).ok());

            let (parts, body) = request.into_parts();
            let body_bytes = match Limited::new(body, MAX_AUDITED_BODY_BYTES).collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                    warn!(method = %method, uri = %uri, "Request body over the size limit");
                    return Ok(ApiResponse::<()>::failure(
                        StatusCode::PAYLOAD_TOO_LARGE,
                        "PAYLOAD_TOO_LARGE",
                        format!("Request body exceeds {} bytes", MAX_AUDITED_BODY_BYTES),
                    )
                    .into_response());
                },
                Err(e) => {
                    warn!(method = %method, uri = %uri, error = %e, "Failed to capture request body");
                    Bytes::new()
                },
            };
            let request = Request::from_parts(parts, Body::from(body_bytes.clone()));

            let response = inner.call(request).await?;
            let status = response.status();

            if status.is_success() {
                let (action, resource_type, resource_id) = infer(&method, uri.path());
                let changes = if body_bytes.is_empty() {
                    None
                } else {
                    serde_json::from_slice::<JsonValue>(&body_bytes).ok()
                };

                let entry = CreateAuditEntry {
                    user_id,
                    action,
                    resource_type,
                    resource_id,
                    changes,
                    metadata: Some(serde_json::json!({
                        "method": method.as_str(),
                        "uri": uri.to_string(),
                        "status": status.as_u16(),
                    })),
                    ip_address,
                    user_agent,
                };

                tokio::spawn(async move {
                    match repo.record(entry).await {
                        Ok(entry) => debug!(
                            audit_id = %entry.id,
                            action = %entry.action,
                            resource_type = %entry.resource_type,
                            "Audit log entry created"
                        ),
                        Err(e) => error!(error = %e, "Failed to create audit log entry"),
                    }
                });
            } else {
                debug!(method = %method, uri = %uri, status = %status, "Write not audited");
            }

            Ok(response)
        })
    }
}

fn should_audit(method: &Method, path: &str) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
        && path.starts_with(API_PREFIX)
}

/// Action, resource type and first path UUID of an API write
fn infer(method: &Method, path: &str) -> (AuditAction, ResourceType, Option<Uuid>) {
    let segments: Vec<&str> = path
        .strip_prefix(API_PREFIX)
        .unwrap_or(path)
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let resource_type = segments
        .first()
        .map_or(ResourceType::Other, |s| ResourceType::from_segment(s));
    let resource_id = segments.iter().find_map(|s| Uuid::parse_str(s).ok());
    let suffix = segments
        .iter()
        .skip(1)
        .rev()
        .find(|s| Uuid::parse_str(s).is_err())
        .copied();

    let action = match *method {
        Method::POST => suffix
            .and_then(AuditAction::from_suffix)
            .unwrap_or(AuditAction::Create),
        Method::PUT | Method::PATCH if suffix == Some("status") => AuditAction::ChangeStatus,
        Method::PUT | Method::PATCH => AuditAction::Update,
        Method::DELETE if suffix == Some("livestock") => AuditAction::RemoveLivestock,
        Method::DELETE => AuditAction::Delete,
        _ => AuditAction::Other,
    };

    (action, resource_type, resource_id)
}
