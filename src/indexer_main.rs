//! Explorer indexer binary
//!
//! Follows the chain tip with four independent indexers (token watcher,
//! daily statistics, address balances, miner attribution), each resuming
//! from its own persisted cursor.

use anyhow::{Context, Result};
use clap::Parser;
use explorer_indexer::address_balance::{AddressBalanceAggregator, FixedPrice, PriceSource};
use explorer_indexer::chain::ChainSource;
use explorer_indexer::config::{parse_rpc_auth, parse_usd_price, IndexerConfig, Network};
use explorer_indexer::miners::MinerAttribution;
use explorer_indexer::publish::{BroadcastPublisher, IndexerEvent};
use explorer_indexer::rpc::RpcClient;
use explorer_indexer::scheduler::{TipFollower, TipPoller};
use explorer_indexer::statistics::{StatisticsAggregator, STATISTICS};
use explorer_indexer::store::RocksStore;
use explorer_indexer::token_watcher::TokenWatcher;
use explorer_indexer::views::ExplorerViews;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Explorer chain-tip indexer
#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Follow the chain tip and maintain the explorer index")]
struct Args {
    /// Node RPC endpoint URL
    #[arg(short, long, default_value = "http://127.0.0.1:3889")]
    rpc_url: String,

    /// Node RPC credentials as user:password
    #[arg(long)]
    rpc_auth: Option<String>,

    /// Path to RocksDB database directory
    #[arg(short, long, default_value = "./index_db")]
    db_path: PathBuf,

    #[arg(short, long, value_enum, default_value = "mainnet")]
    network: Network,

    /// Tip poll interval in milliseconds
    #[arg(long, default_value_t = 2_000)]
    poll_interval_ms: u64,

    /// Height the token watcher starts after on a fresh store
    #[arg(long, default_value_t = 0)]
    token_start_height: u64,

    /// Coin price in USD for richer-than counts
    #[arg(long)]
    usd_price: Option<String>,

    /// Largest page the read views return
    #[arg(long, default_value_t = 100)]
    max_page_size: usize,
}

impl Args {
    fn into_config(self) -> Result<IndexerConfig> {
        Ok(IndexerConfig {
            rpc_url: self.rpc_url,
            rpc_auth: self.rpc_auth.as_deref().map(parse_rpc_auth).transpose()?,
            db_path: self.db_path,
            network: self.network,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            token_start_height: self.token_start_height,
            usd_price: self.usd_price.as_deref().map(parse_usd_price).transpose()?,
            max_page_size: self.max_page_size,
        })
    }
}

/// Log indexer progress; statistics passes also log the 24h figures.
async fn log_events(mut events: broadcast::Receiver<IndexerEvent>, views: ExplorerViews) {
    loop {
        match events.recv().await {
            Ok(IndexerEvent::BlockCommitted { indexer, height }) => {
                debug!(indexer, height, "Block committed");
            }
            Ok(IndexerEvent::PassCompleted { indexer, height }) => {
                info!(indexer, height, "Caught up");
                if indexer == STATISTICS {
                    if let Ok(rollup) = views.last_24h() {
                        info!(
                            blocks = rollup.blocks,
                            transactions = rollup.transactions,
                            output_volume_sat = %rollup.output_volume_sat,
                            "Last 24h"
                        );
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event log lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config()?;
    config.validate().context("Invalid configuration")?;
    let version = config.address_version();

    info!("Starting explorer indexer");
    info!("RPC URL: {}", config.rpc_url);
    info!("Network: {:?}", config.network);
    info!("Database: {:?}", config.db_path);

    let chain: Arc<dyn ChainSource> =
        Arc::new(RpcClient::new(config.rpc_url.clone(), config.rpc_auth.clone()));

    let store = Arc::new(
        RocksStore::open(&config.db_path)
            .with_context(|| format!("Failed to open database at {:?}", config.db_path))?,
    );

    let publisher = Arc::new(BroadcastPublisher::new(1024));
    let events = publisher.subscribe();
    let price: Arc<dyn PriceSource> = Arc::new(FixedPrice::new(config.usd_price.clone()));

    let tokens = Arc::new(TipFollower::new(
        TokenWatcher::new(chain.clone(), store.clone(), version),
        store.clone(),
        publisher.clone(),
        config.token_start_height,
    )?);
    let statistics = Arc::new(TipFollower::new(
        StatisticsAggregator::new(chain.clone(), store.clone()),
        store.clone(),
        publisher.clone(),
        0,
    )?);
    let balances = Arc::new(TipFollower::new(
        AddressBalanceAggregator::new(chain.clone(), store.clone(), price.clone()),
        store.clone(),
        publisher.clone(),
        0,
    )?);
    let miners = Arc::new(TipFollower::new(
        MinerAttribution::new(chain.clone(), store.clone()),
        store.clone(),
        publisher.clone(),
        0,
    )?);

    // Serve summaries from the stored snapshot until the first pass finishes
    if let Err(e) = balances.processor().refresh_summary() {
        warn!("Failed to build balance summary: {:#}", e);
    }

    let views = ExplorerViews::new(store.clone(), version, config.max_page_size)
        .with_price(price)
        .with_summary_cache(balances.processor().summary_cache())
        .with_recent_blocks(statistics.processor().recent());

    let poller = TipPoller::new(chain, config.poll_interval, 64);
    tokio::spawn(tokens.run(poller.subscribe()));
    tokio::spawn(statistics.run(poller.subscribe()));
    tokio::spawn(balances.run(poller.subscribe()));
    tokio::spawn(miners.run(poller.subscribe()));
    tokio::spawn(log_events(events, views));

    // Handle Ctrl+C gracefully
    tokio::select! {
        _ = poller.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    info!("Indexer stopped");
    Ok(())
}
