//! MedAI Control - terminal front end for the MedAI screening panels
//!
//! Each subcommand runs one analysis and exits with a status describing how
//! it ended.

use anyhow::Result;
use clap::Parser;
use medaictl::cli::Cli;
use medaictl::{commands, logging};
use tracing::debug;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    debug!("medaictl v{} starting", env!("MEDAI_VERSION"));

    let code = commands::dispatch(cli).await?;
    std::process::exit(code);
}
