//! ClanTracker - clan configuration gateway

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clantracker::{
    config::Args,
    history::ArchiveHistory,
    identifiers::{IdentifierRegistry, JsonFileStore, LogNotifier},
    server::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("clantracker={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  ClanTracker");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Registry: {}", args.identifier_path().display());
    info!("Archive: {}", args.archive_dir.display());
    info!(
        "Channels: config=#{} manual_points=#{} info=#{}",
        args.config_channel, args.manual_points_channel, args.info_channel
    );
    info!("======================================");

    let store = Arc::new(JsonFileStore::new(args.identifier_path()));
    let registry = IdentifierRegistry::load(store).with_notifier(Arc::new(LogNotifier));
    let registry = Arc::new(registry);
    info!("Registry ready with {} identifier(s)", registry.len().await);

    let history = Arc::new(ArchiveHistory::new(&args.archive_dir));
    let state = Arc::new(AppState::new(args, Arc::clone(&registry), history));

    tokio::select! {
        result = server::run(state) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    if registry.is_dirty() {
        warn!("Registry has unsaved changes, flushing before exit");
        if let Err(e) = registry.flush().await {
            error!("Final registry flush failed: {}", e);
        }
    }

    Ok(())
}
