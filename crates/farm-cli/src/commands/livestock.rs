//! `farm livestock` command implementation

use crate::api::{ApiClient, Livestock, LivestockQuery};
use crate::error::Result;
use crate::output;
use colored::Colorize;
use comfy_table::Table;
use farm_common::types::LivestockStatus;
use uuid::Uuid;

pub async fn list(client: &ApiClient, query: &LivestockQuery) -> Result<()> {
    let result = client.list_livestock(query).await?;

    if result.items.is_empty() {
        println!("No livestock found.");
        return Ok(());
    }

    println!("{}", livestock_table(&result.items));
    println!("{}", output::page_footer(&result.pagination).dimmed());
    Ok(())
}

/// Look up by UUID when the argument parses as one, otherwise by inspection code
pub async fn get(client: &ApiClient, id_or_code: &str) -> Result<()> {
    let animal = match Uuid::parse_str(id_or_code.trim()) {
        Ok(id) => client.get_livestock(id).await?,
        Err(_) => client.get_livestock_by_code(id_or_code.trim()).await?,
    };

    println!("{}", details_table(&animal));
    Ok(())
}

pub async fn change_status(client: &ApiClient, id: Uuid, status: LivestockStatus) -> Result<()> {
    let animal = client.change_livestock_status(id, status).await?;

    println!(
        "{} {} is now {}",
        "Updated".green(),
        animal.inspection_code.bold(),
        animal.status
    );
    Ok(())
}

pub fn livestock_table(animals: &[Livestock]) -> Table {
    let mut table = output::table(&["Code", "Status", "Gender", "Weight (kg)", "Barn"]);
    for a in animals {
        table.add_row(vec![
            a.inspection_code.clone(),
            a.status.to_string(),
            a.gender.to_string(),
            format!("{:.1}", a.weight_kg),
            output::opt(a.barn_id),
        ]);
    }
    table
}

pub fn details_table(animal: &Livestock) -> Table {
    output::details(vec![
        ("ID", animal.id.to_string()),
        ("Inspection code", animal.inspection_code.clone()),
        ("Species", animal.species_id.to_string()),
        ("Barn", output::opt(animal.barn_id)),
        ("Status", animal.status.to_string()),
        ("Gender", animal.gender.to_string()),
        ("Color", output::opt(animal.color.as_deref())),
        ("Weight (kg)", format!("{:.1}", animal.weight_kg)),
        ("Date of birth", output::opt(animal.date_of_birth)),
        ("Origin", output::opt(animal.origin.as_deref())),
    ])
}
