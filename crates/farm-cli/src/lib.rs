//! Farm CLI Library
//!
//! Command-line client for the farm back office API.
//!
//! # Overview
//!
//! - **API client**: [`api::ApiClient`] mirrors the HTTP endpoints and unwraps
//!   the response envelope
//! - **Query cache**: reads are cached per query key and invalidated by the
//!   mutations that touch the same aggregate ([`cache::QueryCache`])
//! - **Commands**: health, dashboard, species, livestock, batch imports,
//!   batch exports and diseases, rendered as tables

pub mod api;
pub mod cache;
pub mod commands;
pub mod error;
pub mod output;

pub use error::{CliError, Result};

use clap::{Args, Parser, Subcommand};
use farm_common::types::{
    BatchExportStatus, BatchImportStatus, LivestockStatus, SpeciesType,
};
use uuid::Uuid;

use api::types::PageQuery;

/// farm - back office client for livestock farms
#[derive(Parser, Debug)]
#[command(name = "farm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Server URL
    #[arg(long, env = "FARM_SERVER_URL", default_value = "http://localhost:8000", global = true)]
    pub server_url: String,

    /// Print the command reference as markdown
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check server and database health
    Health,

    /// Show farm-wide counts
    Dashboard,

    /// Manage species
    Species {
        #[command(subcommand)]
        command: SpeciesCommand,
    },

    /// Inspect livestock and change their status
    Livestock {
        #[command(subcommand)]
        command: LivestockCommand,
    },

    /// Manage batch imports
    Imports {
        #[command(subcommand)]
        command: ImportsCommand,
    },

    /// Browse batch exports
    Exports {
        #[command(subcommand)]
        command: ExportsCommand,
    },

    /// Browse the disease catalogue
    Diseases {
        #[command(subcommand)]
        command: DiseasesCommand,
    },
}

/// Paging flags shared by list commands
#[derive(Args, Debug, Clone, Copy)]
pub struct PageArgs {
    /// Page number (1-based)
    #[arg(long)]
    pub page: Option<i64>,

    /// Items per page
    #[arg(long)]
    pub page_size: Option<i64>,
}

impl From<PageArgs> for PageQuery {
    fn from(args: PageArgs) -> Self {
        PageQuery {
            page: args.page,
            page_size: args.page_size,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum SpeciesCommand {
    /// List species
    List {
        /// Filter by name
        #[arg(short, long)]
        name: Option<String>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Create a species
    Create {
        /// Species name
        name: String,

        /// CATTLE, PIG, POULTRY, GOAT or OTHER
        #[arg(short = 't', long = "type")]
        species_type: SpeciesType,

        #[arg(short, long)]
        description: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum LivestockCommand {
    /// List livestock
    List {
        #[arg(long)]
        species_id: Option<Uuid>,

        #[arg(long)]
        barn_id: Option<Uuid>,

        /// HEALTHY, SICK, QUARANTINED, EXPORTED or DEAD
        #[arg(short, long)]
        status: Option<LivestockStatus>,

        /// Matches inspection code, color or origin
        #[arg(short, long)]
        keyword: Option<String>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Show one animal by id or inspection code
    Get {
        /// UUID or inspection code
        id_or_code: String,
    },

    /// Change an animal's status
    Status {
        id: Uuid,

        /// New status
        status: LivestockStatus,
    },
}

#[derive(Subcommand, Debug)]
pub enum ImportsCommand {
    /// List batch imports
    List {
        /// PENDING, IMPORTING, COMPLETED or CANCELLED
        #[arg(short, long)]
        status: Option<BatchImportStatus>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Close an import early with what has arrived
    Complete { id: Uuid },

    /// Cancel a pending import
    Cancel { id: Uuid },
}

#[derive(Subcommand, Debug)]
pub enum ExportsCommand {
    /// List batch exports
    List {
        /// PENDING, EXPORTING, COMPLETED or CANCELLED
        #[arg(short, long)]
        status: Option<BatchExportStatus>,

        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum DiseasesCommand {
    /// List diseases
    List {
        /// Filter by name
        #[arg(short, long)]
        name: Option<String>,

        #[command(flatten)]
        page: PageArgs,
    },
}
