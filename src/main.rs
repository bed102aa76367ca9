use anyhow::Result;
use clap::Parser;

use taskroute::{cli::Cli, runtime::Orchestrator, utils::init_logger};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    init_logger(cli.verbose);

    let orchestrator = Orchestrator::new(cli)?;
    if !orchestrator.run().await? {
        std::process::exit(1);
    }

    Ok(())
}
