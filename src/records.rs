//! Record types for the materialized collections
//!
//! These structs are the values stored in the index store.
//! They use postcard for binary serialization, which is compact and deterministic.
//! Token amounts stay exact `U256` integers; statistic sums are decimal text.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Discovered token contract, keyed by the creating (tx_hash, vout_idx).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRecord {
    /// Height of the block holding the creating transaction
    pub block_height: u64,
    pub tx_hash: String,
    pub vout_idx: u32,
    /// Derived VM address
    pub contract_address: Address,
    /// Native base58 form of `contract_address`
    pub contract_address_base: String,
    pub symbol: String,
    pub decimals: u8,
    pub name: String,
    pub version: String,
    pub total_supply: U256,
    /// Creation failed (receipt reported the all-zero address)
    pub exception: bool,
}

impl ContractRecord {
    /// Record with default metadata for a freshly derived address.
    pub fn new(
        block_height: u64,
        tx_hash: String,
        vout_idx: u32,
        contract_address: Address,
        contract_address_base: String,
    ) -> Self {
        Self {
            block_height,
            tx_hash,
            vout_idx,
            contract_address,
            contract_address_base,
            symbol: String::new(),
            decimals: 0,
            name: String::new(),
            version: String::new(),
            total_supply: U256::ZERO,
            exception: false,
        }
    }
}

/// One decoded token transfer event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub tx_hash: String,
    /// Position of the log among all logs of the transaction
    pub log_idx: u32,
    pub block_height: u64,
    pub block_time: u64,
    pub tx_time: u64,
    pub contract_address: Address,
    pub contract_address_base: String,
    pub from_eth: Option<Address>,
    pub to_eth: Option<Address>,
    /// Native form of `from_eth`
    pub from: Option<String>,
    /// Native form of `to_eth`
    pub to: Option<String>,
    pub value: U256,
}

impl TransferRecord {
    /// Whether `address` (native form) is the sender or the receiver.
    pub fn involves(&self, address: &str) -> bool {
        self.from.as_deref() == Some(address) || self.to.as_deref() == Some(address)
    }
}

/// Holder balance of one token, reconciled from `balanceOf`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalanceRecord {
    pub contract_address: Address,
    pub address_eth: Address,
    /// Native form of `address_eth`
    pub address: String,
    /// Always positive; zero balances are deleted
    pub amount: U256,
}

/// Per-day (UTC) chain statistics.
///
/// Sums are decimal text so they can be folded with arbitrary precision.
/// Satoshi-denominated: `fees_sum`, `output_volume_sum`, `stake_sum`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStatistic {
    /// `YYYY-MM-DD`
    pub date: String,
    pub fees_sum: String,
    pub fees_count: u64,
    pub tx_count: u64,
    pub blocks_count: u64,
    pub output_volume_sum: String,
    pub difficulty_sum: String,
    pub difficulty_count: u64,
    pub stake_sum: String,
    /// Cumulative supply in coins at `last_height`
    pub supply: String,
    /// Highest block folded into this day
    pub last_height: u64,
}

impl DailyStatistic {
    pub fn empty(date: String) -> Self {
        Self {
            date,
            fees_sum: "0".to_string(),
            fees_count: 0,
            tx_count: 0,
            blocks_count: 0,
            output_volume_sum: "0".to_string(),
            difficulty_sum: "0".to_string(),
            difficulty_count: 0,
            stake_sum: "0".to_string(),
            supply: "0".to_string(),
            last_height: 0,
        }
    }
}

/// Named cumulative counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalStatistic {
    pub name: String,
    /// Decimal text
    pub value: String,
    pub last_height: u64,
}

/// Confirmed native balance of one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBalanceRecord {
    pub address: String,
    pub balance_sat: u64,
}

/// Number of blocks whose reward went to `address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinedBlocksRecord {
    pub address: String,
    pub count: u64,
    pub last_height: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_contract_record_postcard_roundtrip() {
        let mut record = ContractRecord::new(
            100,
            "ab".repeat(32),
            1,
            address!("64d7140c2a6c36a8a0b102ccd14a92f937db070f"),
            "QVd1exampleBase".to_string(),
        );
        record.total_supply = U256::MAX;
        record.decimals = 8;

        let bytes = postcard::to_allocvec(&record).unwrap();
        let decoded: ContractRecord = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(record, decoded);
        assert!(!decoded.exception);
    }

    #[test]
    fn test_transfer_involves() {
        let transfer = TransferRecord {
            tx_hash: "aa".to_string(),
            log_idx: 0,
            block_height: 1,
            block_time: 1,
            tx_time: 1,
            contract_address: Address::ZERO,
            contract_address_base: String::new(),
            from_eth: None,
            to_eth: None,
            from: Some("Qfrom".to_string()),
            to: None,
            value: U256::from(5u64),
        };
        assert!(transfer.involves("Qfrom"));
        assert!(!transfer.involves("Qto"));
    }
}
