//! `farm dashboard` command implementation

use crate::api::{ApiClient, Dashboard};
use crate::error::Result;
use crate::output;
use colored::Colorize;
use comfy_table::Table;

pub async fn run(client: &ApiClient) -> Result<()> {
    let dashboard = client.dashboard().await?;

    println!("{}", "Livestock".cyan().bold());
    println!("{}", livestock_table(&dashboard));
    println!();
    println!("{}", "Batches".cyan().bold());
    println!("{}", batches_table(&dashboard));
    println!();
    println!("Open insurance requests: {}", dashboard.open_insurance_requests);
    println!("Active vaccinations:     {}", dashboard.active_vaccinations);
    println!(
        "{}",
        format!("Generated at {}", dashboard.generated_at.format("%Y-%m-%d %H:%M:%S UTC")).dimmed()
    );

    Ok(())
}

/// Status counts followed by per-species totals
pub fn livestock_table(dashboard: &Dashboard) -> Table {
    let mut table = output::table(&["Group", "Count"]);
    for entry in &dashboard.livestock.by_status {
        table.add_row(vec![entry.status.to_string(), entry.count.to_string()]);
    }
    for species in &dashboard.livestock_by_species {
        table.add_row(vec![species.species_name.clone(), species.count.to_string()]);
    }
    table.add_row(vec!["Total".to_string(), dashboard.livestock.total.to_string()]);
    table
}

pub fn batches_table(dashboard: &Dashboard) -> Table {
    let mut table = output::table(&["Kind", "Status", "Count"]);
    for (kind, tallies) in [
        ("Import", &dashboard.batch_imports_by_status),
        ("Export", &dashboard.batch_exports_by_status),
    ] {
        for tally in tallies {
            table.add_row(vec![kind.to_string(), tally.status.clone(), tally.count.to_string()]);
        }
    }
    table
}
