//! `farm health` command implementation

use crate::api::ApiClient;
use crate::error::Result;
use colored::Colorize;

pub async fn run(client: &ApiClient) -> Result<()> {
    let health = client.health().await?;

    println!("{} {}", "Server:".bold(), client.base_url());
    println!("{} {}", "Status:".bold(), health.status.green());
    println!("{} {}", "Database:".bold(), health.database);
    println!("{} {}", "Version:".bold(), health.version);

    Ok(())
}
