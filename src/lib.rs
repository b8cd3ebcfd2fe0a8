//! Explorer indexer - chain-tip indexers for a UTXO + smart-contract chain
//!
//! This library follows the chain tip with independent, crash-resumable
//! indexers and materializes their results in a persistent RocksDB store:
//! token contracts, transfers and holder balances, daily statistics,
//! address balances and miner attribution.

pub mod keys;
pub mod records;
pub mod store;
pub mod cli;
pub mod config;
pub mod views;

// Chain access and decoding
pub mod abi;
pub mod address;
pub mod chain;
pub mod rpc;
pub mod supply;
pub mod types;

// Indexers
pub mod address_balance;
pub mod cache;
pub mod fee;
pub mod miners;
pub mod publish;
pub mod scheduler;
pub mod statistics;
pub mod token_watcher;
pub mod tracker;

// Re-export the main types for convenience
pub use records::{
    AddressBalanceRecord, ContractRecord, DailyStatistic, MinedBlocksRecord, TokenBalanceRecord,
    TotalStatistic, TransferRecord,
};
pub use store::RocksStore;
