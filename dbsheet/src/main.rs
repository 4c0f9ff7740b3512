//! Database table documentation tool.
//!
//! Connects to a database, reads column metadata for the selected tables
//! and writes a formatted `.xlsx` workbook with one sheet per table.
//!
//! # Security Guarantees
//! - Read-only database operations only
//! - No credentials stored or logged

use clap::Parser;
use dbsheet::{Cli, load_dotenv, run};
use dbsheet_core::logging::init_logging;
use tracing::error;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env must be loaded before parsing so clap sees DATABASE_URL
    let dotenv = load_dotenv();

    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;
    dotenv.log();

    if let Err(e) = run(&cli).await {
        error!("{}", e);
        return Err(e.into());
    }

    Ok(())
}
