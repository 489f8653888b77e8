use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use zonecast::observers::LoggingObserver;
use zonecast::{FileWatcherZoneProvider, ZoneNotifier, ZoneProvider, ZoneStore, ZonecastConfig};

/// Watch zone files and publish every change to the registered observers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Zone file to watch (repeatable); adds to ZONECAST_ZONE_FILES and the config file
    #[arg(short = 'z', long = "zone-file")]
    zone_files: Vec<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Broadcast rounds per update, overriding the configuration
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Per-observer timeout in milliseconds (0 disables it)
    #[arg(long)]
    observer_timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let mut config = ZonecastConfig::from_env()?;
    if let Some(path) = &args.config {
        config = ZonecastConfig::from_toml_file(path, &config)?;
    }
    if let Some(attempts) = args.max_attempts {
        config.notifier.max_attempts = attempts;
    }
    if let Some(ms) = args.observer_timeout_ms {
        config.notifier.observer_timeout = (ms > 0).then(|| Duration::from_millis(ms));
    }
    config.validate()?;

    let mut zone_files: Vec<PathBuf> = config.watcher.zone_files.iter().map(PathBuf::from).collect();
    zone_files.extend(args.zone_files);
    if zone_files.is_empty() {
        return Err("no zone files given (use --zone-file or ZONECAST_ZONE_FILES)".into());
    }

    let notifier = Arc::new(ZoneNotifier::new(config.notifier.clone()));
    let store = Arc::new(ZoneStore::new());
    let _log_subscription = notifier.subscribe(Arc::new(LoggingObserver))?;
    let _store_subscription = notifier.subscribe(store.clone())?;

    let mut providers = Vec::with_capacity(zone_files.len());
    for path in zone_files {
        let provider =
            FileWatcherZoneProvider::from_config(path, &config.watcher, Arc::clone(&notifier));
        if let Err(e) = provider.start().await {
            error!("Failed to start watching {}: {}", provider.path().display(), e);
            continue;
        }
        providers.push(provider);
    }

    if providers.is_empty() {
        notifier.dispose().await;
        return Err("no zone file could be loaded".into());
    }

    info!(
        "Watching {} zone files, {} zones loaded: {:?}",
        providers.len(),
        store.zone_count(),
        store.list_zones()
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    for provider in &providers {
        provider.stop().await;
    }
    notifier.dispose().await;

    Ok(())
}
