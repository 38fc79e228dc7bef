//! parlwatch CLI — parliamentary document monitoring service.
//!
//! Watches parliamentary web pages for newly published documents,
//! classifies them by keyword content, and dispatches digest alerts.

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
