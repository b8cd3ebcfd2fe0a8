//! Network parameters and indexer configuration
//!
//! The binaries build an [`IndexerConfig`] from their command-line arguments
//! and validate it before touching the store or the node.

use crate::views::MAX_PAGE_SIZE;
use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use clap::ValueEnum;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Chain the indexer follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Network {
    Mainnet,
    Testnet,
}

/// Per-network constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkParams {
    /// Base58check version byte of pay-to-pubkey-hash addresses
    pub pubkey_hash_version: u8,
}

impl Network {
    pub fn params(self) -> NetworkParams {
        match self {
            Network::Mainnet => NetworkParams {
                pubkey_hash_version: 0x3a,
            },
            Network::Testnet => NetworkParams {
                pubkey_hash_version: 0x78,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub rpc_url: String,
    /// Basic-auth credentials for the node
    pub rpc_auth: Option<(String, String)>,
    pub db_path: PathBuf,
    pub network: Network,
    pub poll_interval: Duration,
    /// First height the token watcher cares about
    pub token_start_height: u64,
    pub usd_price: Option<BigDecimal>,
    pub max_page_size: usize,
}

impl IndexerConfig {
    pub fn address_version(&self) -> u8 {
        self.network.params().pubkey_hash_version
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.rpc_url.starts_with("http://") || self.rpc_url.starts_with("https://")) {
            anyhow::bail!("RPC URL must be http(s), got {}", self.rpc_url);
        }
        if self.poll_interval.is_zero() {
            anyhow::bail!("Poll interval must be positive");
        }
        if self.max_page_size == 0 || self.max_page_size > MAX_PAGE_SIZE {
            anyhow::bail!(
                "Max page size must be within 1..={}, got {}",
                MAX_PAGE_SIZE,
                self.max_page_size
            );
        }
        if let Some(price) = &self.usd_price {
            if *price < BigDecimal::from(0) {
                anyhow::bail!("USD price must not be negative, got {}", price);
            }
        }
        Ok(())
    }
}

/// Parse a decimal USD price ("0.42").
pub fn parse_usd_price(s: &str) -> Result<BigDecimal> {
    BigDecimal::from_str(s.trim()).with_context(|| format!("Invalid USD price: {}", s))
}

/// Split `user:password` into its parts.
pub fn parse_rpc_auth(s: &str) -> Result<(String, String)> {
    let (user, password) = s
        .split_once(':')
        .with_context(|| "RPC credentials must look like user:password")?;
    if user.is_empty() {
        anyhow::bail!("RPC user is empty");
    }
    Ok((user.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> IndexerConfig {
        IndexerConfig {
            rpc_url: "http://127.0.0.1:3889".to_string(),
            rpc_auth: None,
            db_path: PathBuf::from("./index_db"),
            network: Network::Mainnet,
            poll_interval: Duration::from_secs(2),
            token_start_height: 0,
            usd_price: None,
            max_page_size: 100,
        }
    }

    #[test]
    fn test_network_versions() {
        assert_eq!(Network::Mainnet.params().pubkey_hash_version, 0x3a);
        assert_eq!(Network::Testnet.params().pubkey_hash_version, 0x78);
        assert_eq!(config().address_version(), 0x3a);
    }

    #[test]
    fn test_validate() {
        assert!(config().validate().is_ok());

        let mut bad = config();
        bad.rpc_url = "127.0.0.1:3889".to_string();
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.max_page_size = 101;
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.poll_interval = Duration::ZERO;
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.usd_price = Some(parse_usd_price("-1").unwrap());
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_usd_price(" 0.42 ").unwrap().to_string(), "0.42");
        assert!(parse_usd_price("cheap").is_err());
        assert_eq!(
            parse_rpc_auth("qtum:secret:x").unwrap(),
            ("qtum".to_string(), "secret:x".to_string())
        );
        assert!(parse_rpc_auth("nocolon").is_err());
        assert!(parse_rpc_auth(":pw").is_err());
    }
}
