//! PageSift CLI: scrape paginated listings into CSV with an LLM.
//!
//! Walks the results pages of a search site, extracts one record per
//! listing card, and writes the new, complete records to a CSV file.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
