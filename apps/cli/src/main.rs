//! LinkForge CLI — affiliate link management for markdown content.
//!
//! Scans content for outbound links, assigns stable tracking slugs,
//! rewrites documents to route through a redirect path, and syncs the
//! slug→link table to a store.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
