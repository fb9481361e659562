//! Request helpers for router tests

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use crate::middleware::USER_ID_HEADER;

pub struct TestRequest {
    method: Method,
    uri: String,
    body: Option<Value>,
    user: Option<Uuid>,
}

impl TestRequest {
    fn new(method: Method, uri: &str, body: Option<Value>) -> Self {
        Self {
            method,
            uri: uri.to_string(),
            body,
            user: None,
        }
    }

    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri, None)
    }

    pub fn post(uri: &str, body: Value) -> Self {
        Self::new(Method::POST, uri, Some(body))
    }

    /// POST without a body, for action endpoints like `/:id/cancel`
    pub fn action(uri: &str) -> Self {
        Self::new(Method::POST, uri, None)
    }

    pub fn put(uri: &str, body: Value) -> Self {
        Self::new(Method::PUT, uri, Some(body))
    }

    pub fn delete(uri: &str) -> Self {
        Self::new(Method::DELETE, uri, None)
    }

    pub fn with_user(mut self, user: Uuid) -> Self {
        self.user = Some(user);
        self
    }

    pub fn build(self) -> Request<Body> {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        if let Some(user) = self.user {
            builder = builder.header(USER_ID_HEADER, user.to_string());
        }
        let body = match self.body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            },
            None => Body::empty(),
        };
        builder.body(body).unwrap()
    }
}

/// Send one request through `app` and decode the JSON envelope
pub async fn send(app: Router, request: TestRequest) -> (StatusCode, Value) {
    let response = app.oneshot(request.build()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// `data.id` of a created resource
pub fn id_of(body: &Value) -> String {
    body["data"]["id"].as_str().unwrap().to_string()
}
