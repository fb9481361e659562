//! HTTP surface: router assembly and the server loop

pub mod extract;
pub mod response;

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tracing::info;

use crate::audit::AuditLayer;
use crate::config::Config;
use crate::db::{self, Repositories};
use crate::features;
use crate::middleware::{self, rate_limit};

use self::response::{ApiResponse, AppError};

/// State of the root (non-feature) routes
#[derive(Clone)]
struct RootState {
    /// `None` when running on the in-memory store
    pool: Option<PgPool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub database: String,
    pub version: String,
}

/// Application router with every feature under `/api/v1` and the middleware stack
pub fn build_router(repos: &Repositories, pool: Option<PgPool>, config: &Config) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(RootState { pool })
        .nest("/api/v1", features::router(repos))
        .fallback(not_found)
        // Innermost first
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
        .layer(AuditLayer::new(repos.audit.clone()))
}

/// Bind, serve with peer addresses for rate limiting, shut down on signal
pub async fn serve(config: Config, repos: Repositories, pool: Option<PgPool>) -> anyhow::Result<()> {
    let app = build_router(&repos, pool, &config);
    let app = rate_limit::apply(app, &config.rate_limit)?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Server listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn root() -> ApiResponse<serde_json::Value> {
    ApiResponse::ok(serde_json::json!({
        "name": "Farm Back Office API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health(State(state): State<RootState>) -> Response {
    let version = env!("CARGO_PKG_VERSION").to_string();
    let Some(pool) = state.pool else {
        return ApiResponse::ok(HealthStatus {
            status: "healthy".into(),
            database: "memory".into(),
            version,
        })
        .into_response();
    };

    match db::health_check(&pool).await {
        Ok(()) => ApiResponse::ok(HealthStatus {
            status: "healthy".into(),
            database: "connected".into(),
            version,
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Database health check failed");
            ApiResponse::failure(
                StatusCode::SERVICE_UNAVAILABLE,
                "DATABASE_UNAVAILABLE",
                "Database is not reachable",
            )
            .into_response()
        },
    }
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("Route {} not found", uri.path()))
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown"),
        _ = terminate => info!("Received terminate signal, starting graceful shutdown"),
    }

    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
