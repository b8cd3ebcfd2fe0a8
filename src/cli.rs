//! CLI implementation for indexctl
//!
//! Inspects the index store through the read views and manages indexer
//! cursors. All commands output pretty JSON.

use crate::address_balance::{FixedPrice, ADDRESS_BALANCE};
use crate::config::{parse_usd_price, Network};
use crate::miners::BLOCKS_MINED;
use crate::statistics::STATISTICS;
use crate::store::{CursorRepository, RocksStore, TransferFilter};
use crate::token_watcher::TOKEN_WATCHER;
use crate::views::{parse_time_span, ExplorerViews, MAX_PAGE_SIZE};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// Cursor names of all indexers.
pub const INDEXERS: [&str; 4] = [TOKEN_WATCHER, STATISTICS, ADDRESS_BALANCE, BLOCKS_MINED];

/// Explorer index CLI tool
#[derive(Parser)]
#[command(name = "indexctl")]
#[command(about = "Inspect the explorer index store")]
pub struct Cli {
    /// Path to the RocksDB database directory
    #[arg(short, long, default_value = "./index_db")]
    db_path: PathBuf,

    /// Network whose address format is used
    #[arg(short, long, value_enum, default_value = "mainnet")]
    network: Network,

    /// Coin price in USD for richer-than counts
    #[arg(long)]
    usd_price: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the cursor of one indexer, or of all of them
    GetCursor {
        /// Indexer name
        name: Option<String>,
    },
    /// Raise an indexer cursor (cursors never move down)
    SetCursor {
        /// Indexer name
        name: String,
        /// Last processed height
        height: u64,
    },
    /// Look up a contract by hex address, native address or symbol
    Contract {
        query: String,
    },
    /// Search tokens by symbol, name or address
    Search {
        query: String,
    },
    /// Contract with transfer and holder counts
    Summary {
        contract: String,
    },
    /// Transfers of a contract, newest first
    Transfers {
        contract: String,
        /// Only transfers from or to these addresses (repeatable)
        #[arg(long = "address")]
        addresses: Vec<String>,
        #[arg(long)]
        from_block: Option<u64>,
        #[arg(long)]
        to_block: Option<u64>,
        /// Unix seconds, inclusive
        #[arg(long)]
        from_time: Option<u64>,
        /// Unix seconds, inclusive
        #[arg(long)]
        to_time: Option<u64>,
        #[arg(long)]
        offset: Option<usize>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Holders of a contract, richest first
    Balances {
        contract: String,
        /// Only these holders (repeatable)
        #[arg(long = "address")]
        addresses: Vec<String>,
        #[arg(long)]
        offset: Option<usize>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Token amount held by one address
    TokenBalance {
        contract: String,
        holder: String,
    },
    /// Tokens with holder counts
    Tokens {
        #[arg(long)]
        offset: Option<usize>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Daily statistics ("all" or a number of days)
    Stats {
        days: Option<String>,
    },
    /// Top balances with mined block counts
    Richest,
    /// Number of addresses richer than fixed USD amounts
    RicherThan,
    /// Balance histogram
    Intervals,
    /// Mined block counts of addresses
    Mined {
        #[arg(required = true)]
        addresses: Vec<String>,
    },
    /// Total and circulating supply
    Supply,
}

fn cursor_json(store: &RocksStore, name: &str) -> Result<Value> {
    Ok(json!({ "name": name, "height": store.get_cursor(name)? }))
}

fn check_indexer(name: &str) -> Result<()> {
    if !INDEXERS.contains(&name) {
        anyhow::bail!("Unknown indexer {:?}, expected one of {:?}", name, INDEXERS);
    }
    Ok(())
}

/// Run the CLI command and print JSON output.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let store = Arc::new(
        RocksStore::open(&cli.db_path)
            .with_context(|| format!("Failed to open database at {:?}", cli.db_path))?,
    );

    let price = cli.usd_price.as_deref().map(parse_usd_price).transpose()?;
    let views = ExplorerViews::new(
        store.clone(),
        cli.network.params().pubkey_hash_version,
        MAX_PAGE_SIZE,
    )
    .with_price(Arc::new(FixedPrice::new(price)));

    let result = match cli.command {
        Commands::GetCursor { name } => match name {
            Some(name) => {
                check_indexer(&name)?;
                cursor_json(&store, &name)?
            }
            None => Value::Array(
                INDEXERS
                    .iter()
                    .map(|name| cursor_json(&store, name))
                    .collect::<Result<Vec<_>>>()?,
            ),
        },
        Commands::SetCursor { name, height } => {
            check_indexer(&name)?;
            store.set_cursor(&name, height)?;
            json!({ "status": "ok", "name": name, "height": height })
        }
        Commands::Contract { query } => serde_json::to_value(views.contract(&query)?)?,
        Commands::Search { query } => serde_json::to_value(views.search_tokens(&query)?)?,
        Commands::Summary { contract } => serde_json::to_value(views.token_summary(&contract)?)?,
        Commands::Transfers {
            contract,
            addresses,
            from_block,
            to_block,
            from_time,
            to_time,
            offset,
            limit,
        } => {
            let filter = TransferFilter {
                addresses,
                from_block,
                to_block,
                from_time,
                to_time,
            };
            let page = views.page(offset, limit);
            serde_json::to_value(views.transfers(&contract, filter, page)?)?
        }
        Commands::Balances {
            contract,
            addresses,
            offset,
            limit,
        } => {
            let page = views.page(offset, limit);
            serde_json::to_value(views.balances(&contract, &addresses, page)?)?
        }
        Commands::TokenBalance { contract, holder } => json!({
            "contract": contract,
            "holder": holder,
            "amount": views.token_balance(&contract, &holder)?,
        }),
        Commands::Tokens { offset, limit } => {
            serde_json::to_value(views.tokens(views.page(offset, limit))?)?
        }
        Commands::Stats { days } => {
            let days = parse_time_span(days.as_deref());
            serde_json::to_value(views.daily_statistics(days)?)?
        }
        Commands::Richest => serde_json::to_value(views.richest()?)?,
        Commands::RicherThan => serde_json::to_value(views.richer_than()?)?,
        Commands::Intervals => serde_json::to_value(views.balance_intervals()?)?,
        Commands::Mined { addresses } => serde_json::to_value(views.mined_blocks(&addresses)?)?,
        Commands::Supply => serde_json::to_value(views.supply()?)?,
    };

    // Pretty print JSON
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transfers_command() {
        let cli = Cli::try_parse_from([
            "indexctl",
            "--network",
            "testnet",
            "transfers",
            "64d7140c2a6c36a8a0b102ccd14a92f937db070f",
            "--address",
            "qA",
            "--address",
            "qB",
            "--from-block",
            "10",
            "--limit",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.network, Network::Testnet);
        match cli.command {
            Commands::Transfers {
                addresses,
                from_block,
                limit,
                ..
            } => {
                assert_eq!(addresses, vec!["qA", "qB"]);
                assert_eq!(from_block, Some(10));
                assert_eq!(limit, Some(5));
            }
            _ => panic!("expected transfers"),
        }
    }

    #[test]
    fn test_mined_requires_addresses() {
        assert!(Cli::try_parse_from(["indexctl", "mined"]).is_err());
    }

    #[test]
    fn test_check_indexer() {
        assert!(check_indexer(STATISTICS).is_ok());
        assert!(check_indexer("nope").is_err());
    }
}
