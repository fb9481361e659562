//! Shared helpers for farm-server integration tests
//!
//! [`TestApp`] wraps the full router (`/api/v1`, middleware, audit layer)
//! over either repository backend: the in-memory store, or PostgreSQL on a
//! pool handed out by `#[sqlx::test]`.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use farm_server::api::build_router;
use farm_server::config::Config;
use farm_server::db::memory::MemoryStore;
use farm_server::Repositories;
use sqlx::PgPool;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

pub const API: &str = "/api/v1";

pub struct TestApp {
    pub repos: Repositories,
    router: Router,
}

impl TestApp {
    /// Router over the in-memory store
    pub fn new() -> Self {
        let store: Arc<MemoryStore> = MemoryStore::shared();
        Self::with_repositories(store.repositories(), None)
    }

    /// Router over the PostgreSQL repositories, as `main` wires them
    pub fn postgres(pool: PgPool) -> Self {
        let config = Config::default();
        let repos = Repositories::postgres(pool.clone(), &config.farm);
        Self::with_repositories(repos, Some(pool))
    }

    fn with_repositories(repos: Repositories, pool: Option<PgPool>) -> Self {
        let router = build_router(&repos, pool, &Config::default());
        Self { repos, router }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        user: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(format!("{}{}", API, path));
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.request(Method::GET, path, None, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, path, Some(body), None).await
    }

    /// POST without a body, for state-change actions
    pub async fn action(&self, path: &str) -> (StatusCode, Value) {
        self.request(Method::POST, path, None, None).await
    }

    pub async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, path, Some(body), None).await
    }

    pub async fn delete(&self, path: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, path, None, None).await
    }

    /// POST expected to succeed; returns the new resource's id
    pub async fn create(&self, path: &str, body: Value) -> String {
        let (status, resp) = self.post(path, body).await;
        assert_eq!(status, StatusCode::CREATED, "POST {} failed: {}", path, resp);
        id_of(&resp)
    }
}

/// `data.id` of an envelope
pub fn id_of(envelope: &Value) -> String {
    envelope["data"]["id"].as_str().unwrap().to_string()
}

/// Let spawned audit writes land
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}
