//! Build automation tasks for the farm workspace
//!
//! - `generate-cli-docs`: render the `farm` command reference to markdown

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for the farm workspace", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<farm_cli::Cli>();

    let content = format!(
        r#"# farm CLI Reference

Generated from the CLI source on {}.

## Quick Start

```bash
# Point the CLI at a running server
export FARM_SERVER_URL=http://localhost:8000

farm health
farm dashboard
farm species create "Bò vàng" --type CATTLE
farm livestock list --status sick
farm livestock get 000001
farm imports complete <batch-import-id>
```

## Environment Variables

- `FARM_SERVER_URL` - Server URL (default: `http://localhost:8000`)
- `FARM_API_TIMEOUT_SECS` - Request timeout in seconds (default: `30`)
- `FARM_QUERY_CACHE_TTL_SECS` - Lifetime of cached reads in seconds (default: `60`)
- `LOG_LEVEL` - Logging level (`trace`, `debug`, `info`, `warn`, `error`)

## Commands

{}

---

*To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());
    Ok(())
}
