//! `farm diseases` command implementation

use crate::api::{ApiClient, Disease, PageQuery};
use crate::error::Result;
use crate::output;
use colored::Colorize;
use comfy_table::Table;

pub async fn list(client: &ApiClient, name: Option<&str>, page: PageQuery) -> Result<()> {
    let result = client.list_diseases(name, page).await?;

    if result.items.is_empty() {
        println!("No diseases found.");
        return Ok(());
    }

    println!("{}", diseases_table(&result.items));
    println!("{}", output::page_footer(&result.pagination).dimmed());
    Ok(())
}

pub fn diseases_table(diseases: &[Disease]) -> Table {
    let mut table = output::table(&["Name", "Type", "Symptom"]);
    for d in diseases {
        table.add_row(vec![
            d.name.clone(),
            d.disease_type.to_string(),
            output::opt(d.symptom.as_deref()),
        ]);
    }
    table
}
