//! Farm Back Office Server - Main entry point

use anyhow::Result;
use farm_common::logging::{init_logging, LogConfig};
use tracing::info;

use farm_server::{
    api,
    config::Config,
    db::{self, DbConfig, Repositories},
};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("farm-server")
        .filter_directives("farm_server=debug,tower_http=debug,sqlx=warn")
        .build()
        .merge_env()?;
    let _log_guard = init_logging(&log_config)?;

    info!("Starting farm back office server");

    let config = Config::load()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        "Configuration loaded"
    );

    let pool = db::create_pool(&DbConfig::from(&config.database)).await?;
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
    info!("Database migrations completed");

    let repos = Repositories::postgres(pool.clone(), &config.farm);
    api::serve(config, repos, Some(pool)).await
}
