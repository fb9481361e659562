//! `farm species` command implementation

use crate::api::{ApiClient, CreateSpeciesRequest, PageQuery, Species};
use crate::error::Result;
use crate::output;
use colored::Colorize;
use comfy_table::Table;
use farm_common::types::SpeciesType;

pub async fn list(client: &ApiClient, name: Option<&str>, page: PageQuery) -> Result<()> {
    let result = client.list_species(name, page).await?;

    if result.items.is_empty() {
        println!("No species found.");
        return Ok(());
    }

    println!("{}", species_table(&result.items));
    println!("{}", output::page_footer(&result.pagination).dimmed());
    Ok(())
}

pub async fn create(
    client: &ApiClient,
    name: String,
    species_type: SpeciesType,
    description: Option<String>,
) -> Result<()> {
    let species = client
        .create_species(&CreateSpeciesRequest {
            name,
            description,
            species_type,
        })
        .await?;

    println!("{} {} ({})", "Created species".green(), species.name.bold(), species.id);
    Ok(())
}

pub fn species_table(species: &[Species]) -> Table {
    let mut table = output::table(&["ID", "Name", "Type", "Description"]);
    for s in species {
        table.add_row(vec![
            s.id.to_string(),
            s.name.clone(),
            s.species_type.to_string(),
            output::opt(s.description.as_deref()),
        ]);
    }
    table
}
