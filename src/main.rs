mod cli;
mod commands;
mod mcp;
mod page_range;
mod pdf;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    // stdout carries command output and the MCP transport
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        None => {
            commands::bookmark::run(cli.bookmark)?;
        }
        Some(Commands::Mcp) => {
            mcp::run_server().await?;
        }
        Some(Commands::Catalogue {
            path,
            catalogue,
            output,
            json,
        }) => {
            commands::catalogue::run(&path, catalogue, output.as_deref(), json)?;
        }
        Some(Commands::Outline { path }) => {
            commands::outline::run(&path)?;
        }
        Some(Commands::Info { path }) => {
            commands::info::run(&path)?;
        }
        Some(Commands::Batch {
            dir,
            output_dir,
            mode,
            catalogue,
        }) => {
            commands::batch::run(&dir, output_dir.as_deref(), mode, catalogue)?;
        }
    }

    Ok(())
}
