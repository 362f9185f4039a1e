//! polycrawl CLI: freshness-gated web crawler and freshness service.
//!
//! Crawls pages, splits their text per script, posts documents to a search
//! index, and serves URL freshness decisions over HTTP.

mod commands;
mod server;

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
