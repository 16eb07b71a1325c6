use clap::Parser;
use miette::Result;
use packwallet::interfaces::cli::{Cli, run};
use packwallet::logging::setup_logging;
use std::io;

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(cli, &mut out).await
}
