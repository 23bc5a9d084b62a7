use std::path::PathBuf;

use clap::Parser;

/// Fetch active NOAA weather alerts, filter them to the configured counties,
/// and push anything new via Pushover.
#[derive(Debug, Parser)]
#[command(name = "stormwatch", version, about)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Create the alert store and exit.
    #[arg(long, conflicts_with = "purge")]
    pub init: bool,

    /// Delete every recorded alert and exit.
    #[arg(long)]
    pub purge: bool,

    /// Run the full cycle but deliver nothing and record nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Log at debug level.
    #[arg(long)]
    pub debug: bool,
}
