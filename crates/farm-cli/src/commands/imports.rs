//! `farm imports` command implementation

use crate::api::{ApiClient, BatchImport, PageQuery};
use crate::error::Result;
use crate::output;
use colored::Colorize;
use comfy_table::Table;
use farm_common::types::BatchImportStatus;
use uuid::Uuid;

pub async fn list(
    client: &ApiClient,
    status: Option<BatchImportStatus>,
    page: PageQuery,
) -> Result<()> {
    let result = client.list_batch_imports(status, page).await?;

    if result.items.is_empty() {
        println!("No batch imports found.");
        return Ok(());
    }

    println!("{}", imports_table(&result.items));
    println!("{}", output::page_footer(&result.pagination).dimmed());
    Ok(())
}

pub async fn complete(client: &ApiClient, id: Uuid) -> Result<()> {
    let batch = client.complete_batch_import(id).await?;
    println!(
        "{} {} with {} of {} livestock",
        "Completed".green(),
        batch.name.bold(),
        batch.imported_quantity,
        batch.expected_quantity
    );
    Ok(())
}

pub async fn cancel(client: &ApiClient, id: Uuid) -> Result<()> {
    let batch = client.cancel_batch_import(id).await?;
    println!("{} {}", "Cancelled".yellow(), batch.name.bold());
    Ok(())
}

pub fn imports_table(batches: &[BatchImport]) -> Table {
    let mut table = output::table(&["ID", "Name", "Supplier", "Expected date", "Imported", "Status"]);
    for b in batches {
        table.add_row(vec![
            b.id.to_string(),
            b.name.clone(),
            b.supplier.clone(),
            b.expected_import_date.to_string(),
            format!("{}/{}", b.imported_quantity, b.expected_quantity),
            b.status.to_string(),
        ]);
    }
    table
}
