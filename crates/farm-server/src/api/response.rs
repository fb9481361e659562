//! API response types
//!
//! Every endpoint answers with the same envelope:
//!
//! ```json
//! { "statusCode": 200, "success": true, "data": {...}, "errors": null, "message": "OK" }
//! ```
//!
//! Failures carry `data: null` and a list of [`ErrorDetail`]. `statusCode`
//! always mirrors the HTTP status line.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::DbError;

/// Uniform response envelope
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub success: bool,
    pub data: Option<T>,
    pub errors: Option<Vec<ErrorDetail>>,
    pub message: String,
}

/// A single error entry of a failure envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
        }
    }

    /// Validation error attached to a request field
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: "VALIDATION_ERROR".to_string(),
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 with data
    pub fn ok(data: T) -> Self {
        Self::with_status(StatusCode::OK, data, "OK")
    }

    /// 201 with the created resource
    pub fn created(data: T) -> Self {
        Self::with_status(StatusCode::CREATED, data, "Created")
    }

    pub fn with_status(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            success: true,
            data: Some(data),
            errors: None,
            message: message.into(),
        }
    }

    /// Replace the default message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl ApiResponse<()> {
    pub fn failure(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::failure_with_errors(status, message.clone(), vec![ErrorDetail::new(code, message)])
    }

    pub fn failure_with_errors(
        status: StatusCode,
        message: impl Into<String>,
        errors: Vec<ErrorDetail>,
    ) -> Self {
        Self {
            status_code: status.as_u16(),
            success: false,
            data: None,
            errors: Some(errors),
            message: message.into(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Application error type that can be converted to HTTP responses
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Validation failed")]
    Validation(Vec<ErrorDetail>),
    #[error("{0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let envelope = match self {
            AppError::NotFound(msg) => ApiResponse::failure(status, "NOT_FOUND", msg),
            AppError::BadRequest(msg) => ApiResponse::failure(status, "BAD_REQUEST", msg),
            AppError::Conflict(msg) => ApiResponse::failure(status, "CONFLICT", msg),
            AppError::Validation(errors) => {
                ApiResponse::failure_with_errors(status, "Validation failed", errors)
            },
            AppError::Database(err) => {
                tracing::error!(error = %err, "Database error");
                ApiResponse::failure(status, "DATABASE_ERROR", "A database error occurred")
            },
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ApiResponse::failure(status, "INTERNAL_ERROR", "An internal error occurred")
            },
        };
        envelope.into_response()
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => AppError::NotFound(err.to_string()),
            DbError::Duplicate { .. } | DbError::Conflict(_) | DbError::InvalidState { .. } => {
                AppError::Conflict(err.to_string())
            },
            DbError::Validation(msg) => AppError::BadRequest(msg),
            DbError::Sqlx(err) => AppError::Database(err),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err)
    }
}

/// Alias for Result with AppError
pub type ApiResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ok_envelope_shape() {
        let response = ApiResponse::ok(serde_json::json!({"id": 1})).into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["statusCode"], 200);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["id"], 1);
        assert!(body["errors"].is_null());
        assert_eq!(body["message"], "OK");
    }

    #[tokio::test]
    async fn test_created_uses_201() {
        let response = ApiResponse::created("x").with_message("Species created").into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["statusCode"], 201);
        assert_eq!(body["message"], "Species created");
    }

    #[tokio::test]
    async fn test_error_status_codes_match_envelope() {
        let cases = vec![
            (AppError::NotFound("missing".into()), 404),
            (AppError::BadRequest("bad".into()), 400),
            (AppError::Validation(vec![ErrorDetail::field("name", "required")]), 422),
            (AppError::Conflict("taken".into()), 409),
            (AppError::Internal("boom".into()), 500),
        ];

        for (error, expected) in cases {
            let response = error.into_response();
            assert_eq!(response.status().as_u16(), expected);
            let body = body_json(response).await;
            assert_eq!(body["statusCode"], expected);
            assert_eq!(body["success"], false);
            assert!(body["data"].is_null());
            assert!(body["errors"].is_array());
        }
    }

    #[tokio::test]
    async fn test_validation_errors_carry_fields() {
        let response = AppError::Validation(vec![
            ErrorDetail::field("name", "Name is required"),
            ErrorDetail::field("capacity", "Capacity must not be negative"),
        ])
        .into_response();

        let body = body_json(response).await;
        let errors = body["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0]["field"], "name");
        assert_eq!(errors[1]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_internal_error_message_is_generic() {
        let body = body_json(AppError::Internal("secret detail".into()).into_response()).await;
        assert_eq!(body["message"], "An internal error occurred");
    }

    #[test]
    fn test_db_error_mapping() {
        let not_found: AppError = DbError::not_found("Species", "abc").into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let dup: AppError = DbError::duplicate("Species", "Cow").into();
        assert_eq!(dup.status(), StatusCode::CONFLICT);

        let state: AppError = DbError::invalid_state("Batch import", "COMPLETED", "cancel").into();
        assert_eq!(state.status(), StatusCode::CONFLICT);

        let validation: AppError = DbError::Validation("warranty expired".into()).into();
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);
    }
}
