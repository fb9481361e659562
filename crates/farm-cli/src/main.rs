//! farm CLI - Main entry point

use clap::Parser;
use farm_cli::api::{ApiClient, LivestockQuery};
use farm_cli::commands;
use farm_cli::{
    Cli, Commands, DiseasesCommand, ExportsCommand, ImportsCommand, LivestockCommand,
    SpeciesCommand,
};
use farm_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // .env may carry FARM_SERVER_URL
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return;
    }

    let Some(command) = cli.command else {
        eprintln!("Error: A subcommand is required");
        eprintln!();
        eprintln!("For more information, try '--help'.");
        process::exit(2);
    };

    let level = if cli.verbose { LogLevel::Debug } else { LogLevel::Warn };
    let log_config = LogConfig::builder()
        .level(level)
        .output(LogOutput::Console)
        .log_file_prefix("farm-cli")
        .build();
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // The CLI works without logging
    let _log_guard = init_logging(&log_config).ok();

    let result = match ApiClient::new(cli.server_url) {
        Ok(client) => execute_command(&client, command).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn execute_command(client: &ApiClient, command: Commands) -> farm_cli::Result<()> {
    match command {
        Commands::Health => commands::health::run(client).await,

        Commands::Dashboard => commands::dashboard::run(client).await,

        Commands::Species { command } => match command {
            SpeciesCommand::List { name, page } => {
                commands::species::list(client, name.as_deref(), page.into()).await
            },
            SpeciesCommand::Create {
                name,
                species_type,
                description,
            } => commands::species::create(client, name, species_type, description).await,
        },

        Commands::Livestock { command } => match command {
            LivestockCommand::List {
                species_id,
                barn_id,
                status,
                keyword,
                page,
            } => {
                let query = LivestockQuery {
                    species_id,
                    barn_id,
                    status,
                    keyword,
                    page: page.into(),
                };
                commands::livestock::list(client, &query).await
            },
            LivestockCommand::Get { id_or_code } => {
                commands::livestock::get(client, &id_or_code).await
            },
            LivestockCommand::Status { id, status } => {
                commands::livestock::change_status(client, id, status).await
            },
        },

        Commands::Imports { command } => match command {
            ImportsCommand::List { status, page } => {
                commands::imports::list(client, status, page.into()).await
            },
            ImportsCommand::Complete { id } => commands::imports::complete(client, id).await,
            ImportsCommand::Cancel { id } => commands::imports::cancel(client, id).await,
        },

        Commands::Exports { command } => match command {
            ExportsCommand::List { status, page } => {
                commands::exports::list(client, status, page.into()).await
            },
        },

        Commands::Diseases { command } => match command {
            DiseasesCommand::List { name, page } => {
                commands::diseases::list(client, name.as_deref(), page.into()).await
            },
        },
    }
}
