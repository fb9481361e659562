//! `farm exports` command implementation

use crate::api::{ApiClient, BatchExport, PageQuery};
use crate::error::Result;
use crate::output;
use colored::Colorize;
use comfy_table::Table;
use farm_common::types::BatchExportStatus;

pub async fn list(
    client: &ApiClient,
    status: Option<BatchExportStatus>,
    page: PageQuery,
) -> Result<()> {
    let result = client.list_batch_exports(status, page).await?;

    if result.items.is_empty() {
        println!("No batch exports found.");
        return Ok(());
    }

    println!("{}", exports_table(&result.items));
    println!("{}", output::page_footer(&result.pagination).dimmed());
    Ok(())
}

pub fn exports_table(batches: &[BatchExport]) -> Table {
    let mut table = output::table(&["ID", "Customer", "Export date", "Shipped", "Warranty", "Status"]);
    for b in batches {
        table.add_row(vec![
            b.id.to_string(),
            b.customer_name.clone(),
            b.export_date.to_string(),
            format!("{}/{}", b.exported_quantity, b.total_livestock),
            format!("{} days", b.warranty_days),
            b.status.to_string(),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    #[test]
    fn test_exports_table_shows_progress() {
        let batch = BatchExport {
            id: Uuid::new_v4(),
            customer_name: "Lò mổ Hóc Môn".into(),
            customer_phone: None,
            total_livestock: 10,
            exported_quantity: 4,
            export_date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            warranty_days: 30,
            status: BatchExportStatus::Exporting,
        };
        let rendered = exports_table(&[batch]).to_string();
        assert!(rendered.contains("4/10"));
        assert!(rendered.contains("30 days"));
        assert!(rendered.contains("EXPORTING"));
    }
}
