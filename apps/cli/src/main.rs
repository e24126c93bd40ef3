//! tubekeeper CLI: manage the link section of YouTube descriptions and keep
//! a local snapshot of every video's metadata.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await.map_err(commands::with_hints)
}
