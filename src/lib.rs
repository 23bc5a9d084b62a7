pub mod cli;
pub mod config;
pub mod domain;
pub mod feed;
pub mod filter;
pub mod notifier;
pub mod store;
pub mod watcher;

use anyhow::Result;
use tracing::info;

use cli::Cli;
use config::AppConfig;
use feed::CapFeedClient;
use filter::RegionFilter;
use notifier::{ConsoleNotifier, NotifierHub, PushoverNotifier};
use store::SeenStore;
use watcher::Stormwatch;

pub async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(&cli.config)?;

    if cli.init {
        SeenStore::create(&config.store_path)?;
        info!("🗄️  Alert store ready at {}", config.store_path.display());
        return Ok(());
    }

    let store = SeenStore::open(&config.store_path)?;

    if cli.purge {
        let cleared = store.purge()?;
        info!("🧹 Purged {} recorded alerts", cleared);
        return Ok(());
    }

    info!("👁️  Watching {} counties", config.counties.len());
    let filter = RegionFilter::new(&config.counties);
    let feed = CapFeedClient::new(config.feed_url);

    let console = ConsoleNotifier::new();
    let pushover = if cli.dry_run {
        info!("📱 Dry run: Pushover delivery disabled");
        None
    } else {
        Some(PushoverNotifier::new(&config.pushover))
    };
    let notifier = NotifierHub::new(console, pushover);

    let app = Stormwatch::new(
        feed,
        filter,
        store,
        notifier,
        config.ignored_events,
        cli.dry_run,
    );
    let report = app.run().await?;

    info!(
        "✅ Done: {} matched, {} pushed, {} already seen, {} failed",
        report.matched, report.notified, report.already_seen, report.failed
    );

    Ok(())
}
