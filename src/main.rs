//! AdBounty Server
//!
//! REST API for bounties, bids, view confirmation and payouts

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use adbounty::{
    BountyLedger, Config, LedgerStorage, LogGateway, MemoryStorage, NotificationGateway,
    NotificationRelay, SqliteStorage, StorageBackend, TelegramGateway,
};
use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const RELAY_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "adbounty-server")]
#[command(version)]
#[command(about = "AdBounty API server", long_about = None)]
struct Args {
    /// Path to config.toml
    #[arg(short, long, env = "ADBOUNTY_CONFIG", default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load_from(&args.config)?;

    info!("Starting AdBounty Server");

    let storage: Box<dyn LedgerStorage> = match config.storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on restart");
            Box::new(MemoryStorage::new())
        }
        StorageBackend::Sqlite => Box::new(
            SqliteStorage::new(&config.storage.path)
                .with_context(|| format!("Failed to open {}", config.storage.path))?,
        ),
    };

    let gateway: Arc<dyn NotificationGateway> = match config.bot_token() {
        Some(token) => Arc::new(TelegramGateway::new(token, &config.telegram.api_base)),
        None => {
            warn!("BOT_TOKEN not set; notifications will only be logged");
            Arc::new(LogGateway)
        }
    };

    let (notifier, relay) = NotificationRelay::spawn(
        gateway,
        config.notifications.retry_policy(),
        config.notifications.queue_capacity,
    );

    let ledger = Arc::new(
        BountyLedger::new(storage)
            .with_notifier(notifier)
            .with_default_deadline_days(config.bounties.default_deadline_days),
    );

    adbounty::server::run_server(&config.bind_addr(), ledger).await?;

    // The router held the last ledger handle; give the relay time to drain.
    match tokio::time::timeout(RELAY_DRAIN_TIMEOUT, relay).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Notification relay ended abnormally: {}", e),
        Err(_) => warn!("Notification relay did not drain in time"),
    }

    Ok(())
}
