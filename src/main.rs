// Stormwatch - NOAA Weather Alert Monitor
// Polls the NWS CAP feed and pushes new alerts for watched counties via Pushover

use anyhow::Result;
use clap::Parser;
use stormwatch::cli::Cli;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🌩️  Starting Stormwatch - NOAA weather alert monitor");

    stormwatch::run(cli).await
}
