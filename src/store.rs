//! Repository traits and RocksDB implementation
//!
//! One trait per materialized collection. [`RocksStore`] implements all of
//! them over a single RocksDB instance with one column family per collection
//! plus the secondary index families used for ordering.

use crate::keys::{
    decode_address_rank_key, encode_address_balance_key, encode_address_rank_key,
    encode_contract_index_key, encode_contract_key, encode_cursor_key, encode_daily_key,
    encode_mined_key, encode_token_balance_key, encode_token_balance_prefix,
    encode_token_rank_key, encode_token_rank_prefix, encode_total_key, encode_transfer_key,
    encode_transfer_prefix,
};
use crate::records::{
    AddressBalanceRecord, ContractRecord, DailyStatistic, MinedBlocksRecord, TokenBalanceRecord,
    TotalStatistic, TransferRecord,
};
use alloy_primitives::{Address, U256};
use anyhow::{Context, Result};
use rocksdb::{ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub const CF_CURSORS: &str = "cursors";
pub const CF_CONTRACTS: &str = "contracts";
pub const CF_CONTRACT_INDEX: &str = "contract_index";
pub const CF_TRANSFERS: &str = "transfers";
pub const CF_TOKEN_BALANCES: &str = "token_balances";
pub const CF_TOKEN_RANK: &str = "token_balance_rank";
pub const CF_DAILY: &str = "daily_stats";
pub const CF_TOTALS: &str = "totals";
pub const CF_ADDRESS_BALANCES: &str = "address_balances";
pub const CF_ADDRESS_RANK: &str = "address_balance_rank";
pub const CF_MINED: &str = "blocks_mined";

const COLUMN_FAMILIES: [&str; 11] = [
    CF_CURSORS,
    CF_CONTRACTS,
    CF_CONTRACT_INDEX,
    CF_TRANSFERS,
    CF_TOKEN_BALANCES,
    CF_TOKEN_RANK,
    CF_DAILY,
    CF_TOTALS,
    CF_ADDRESS_BALANCES,
    CF_ADDRESS_RANK,
    CF_MINED,
];

/// Persisted per-indexer progress.
pub trait CursorRepository: Send + Sync {
    /// Last processed height, if the cursor exists.
    fn get_cursor(&self, name: &str) -> Result<Option<u64>>;

    /// Move the cursor to `height`. Fails if that would move it backwards.
    fn set_cursor(&self, name: &str, height: u64) -> Result<()>;

    /// Create the cursor at 0 if missing, then raise it to `from` when larger.
    /// Returns the resulting height.
    fn ensure_cursor(&self, name: &str, from: u64) -> Result<u64>;
}

/// Discovered token contracts.
pub trait ContractRepository: Send + Sync {
    /// Upsert keyed by (tx_hash, vout_idx) and refresh the address index.
    fn put_contract(&self, contract: &ContractRecord) -> Result<()>;

    fn get_contract(&self, tx_hash: &str, vout_idx: u32) -> Result<Option<ContractRecord>>;

    fn get_contract_by_address(&self, contract: Address) -> Result<Option<ContractRecord>>;

    /// All contracts in key order.
    fn list_contracts(&self) -> Result<Vec<ContractRecord>>;
}

/// Filters for transfer queries. Empty fields do not constrain.
#[derive(Debug, Clone, Default)]
pub struct TransferFilter {
    /// Native addresses; a transfer matches if its sender or receiver is listed
    pub addresses: Vec<String>,
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
    /// Inclusive bounds on block time (Unix seconds)
    pub from_time: Option<u64>,
    pub to_time: Option<u64>,
}

impl TransferFilter {
    pub fn matches(&self, transfer: &TransferRecord) -> bool {
        if !self.addresses.is_empty() && !self.addresses.iter().any(|a| transfer.involves(a)) {
            return false;
        }
        if self.from_block.map_or(false, |b| transfer.block_height < b)
            || self.to_block.map_or(false, |b| transfer.block_height > b)
        {
            return false;
        }
        if self.from_time.map_or(false, |t| transfer.block_time < t)
            || self.to_time.map_or(false, |t| transfer.block_time > t)
        {
            return false;
        }
        true
    }
}

/// Decoded transfer events.
pub trait TransferRepository: Send + Sync {
    /// Upsert keyed by (contract, tx_hash, log_idx).
    fn put_transfer(&self, transfer: &TransferRecord) -> Result<()>;

    fn get_transfer(
        &self,
        contract: Address,
        block_height: u64,
        tx_hash: &str,
        log_idx: u32,
    ) -> Result<Option<TransferRecord>>;

    /// Matching transfers of `contract`, newest first, plus the total match count.
    fn find_transfers(
        &self,
        contract: Address,
        filter: &TransferFilter,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<TransferRecord>, usize)>;

    fn count_transfers(&self, contract: Address) -> Result<usize>;
}

/// Token holder balances.
pub trait TokenBalanceRepository: Send + Sync {
    /// Upsert the balance and move its ranking entry.
    fn put_token_balance(&self, balance: &TokenBalanceRecord) -> Result<()>;

    fn delete_token_balance(&self, contract: Address, holder: Address) -> Result<()>;

    fn get_token_balance(&self, contract: Address, holder: Address)
        -> Result<Option<TokenBalanceRecord>>;

    /// Holders of `contract`, richest first, plus the total match count.
    /// `addresses` (native) restricts the result when non-empty.
    fn find_token_balances(
        &self,
        contract: Address,
        addresses: &[String],
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<TokenBalanceRecord>, usize)>;

    fn count_holders(&self, contract: Address) -> Result<usize>;

    /// Number of holders per contract.
    fn holder_counts(&self) -> Result<HashMap<Address, usize>>;
}

/// Per-day statistics.
pub trait DailyStatisticRepository: Send + Sync {
    fn get_day(&self, date: &str) -> Result<Option<DailyStatistic>>;

    fn put_day(&self, day: &DailyStatistic) -> Result<()>;

    /// Days on or after `from_date` (`YYYY-MM-DD`), oldest first.
    fn days_since(&self, from_date: &str) -> Result<Vec<DailyStatistic>>;
}

/// Named cumulative counters.
pub trait TotalStatisticRepository: Send + Sync {
    fn get_total(&self, name: &str) -> Result<Option<TotalStatistic>>;

    fn put_total(&self, total: &TotalStatistic) -> Result<()>;
}

/// Native address balance snapshots.
pub trait AddressBalanceRepository: Send + Sync {
    fn get_address_balance(&self, address: &str) -> Result<Option<AddressBalanceRecord>>;

    /// Upsert the snapshot and move its ranking entry.
    fn put_address_balance(&self, balance: &AddressBalanceRecord) -> Result<()>;

    fn delete_address_balance(&self, address: &str) -> Result<()>;

    /// Top `limit` balances, richest first.
    fn richest(&self, limit: usize) -> Result<Vec<AddressBalanceRecord>>;

    /// Number of addresses holding strictly more than `balance_sat`.
    fn count_richer_than(&self, balance_sat: u64) -> Result<usize>;

    /// Visit every balance in ascending order.
    fn scan_balances(&self, visit: &mut dyn FnMut(&str, u64)) -> Result<()>;
}

/// Mined block attribution.
pub trait MinedBlocksRepository: Send + Sync {
    fn get_mined(&self, address: &str) -> Result<Option<MinedBlocksRecord>>;

    fn put_mined(&self, record: &MinedBlocksRecord) -> Result<()>;

    /// Records for the listed addresses; unknown addresses are omitted.
    fn mined_for(&self, addresses: &[String]) -> Result<Vec<MinedBlocksRecord>>;
}

/// RocksDB-backed implementation of every repository.
///
/// Column families:
/// - cursors: indexer name -> last height (8 bytes BE)
/// - contracts / contract_index: contract records and address -> primary key
/// - transfers: per-contract transfers ordered by height
/// - token_balances / token_balance_rank: holder balances and amount ordering
/// - daily_stats / totals: statistics
/// - address_balances / address_balance_rank: native balances and ordering
/// - blocks_mined: mined block counts
pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    /// Open or create a RocksDB database at the given path.
    ///
    /// Creates all required column families if they don't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let column_families = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, column_families)
            .context("Failed to open RocksDB database")?;

        Ok(Self { db })
    }

    /// Get a column family handle by name.
    fn get_cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .with_context(|| format!("Column family '{}' not found", name))
    }

    fn get_record<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.get_cf(cf_name)?;
        match self
            .db
            .get_cf(cf, key)
            .with_context(|| format!("Failed to read from {}", cf_name))?
        {
            Some(bytes) => {
                let record = postcard::from_bytes(&bytes)
                    .with_context(|| format!("Failed to deserialize {} record", cf_name))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn put_record<T: Serialize>(&self, cf_name: &str, key: &[u8], record: &T) -> Result<()> {
        let cf = self.get_cf(cf_name)?;
        let value = postcard::to_allocvec(record)
            .with_context(|| format!("Failed to serialize {} record", cf_name))?;
        self.db
            .put_cf(cf, key, &value)
            .with_context(|| format!("Failed to write to {}", cf_name))?;
        Ok(())
    }

    /// Decode every value under `prefix`, in key order.
    fn scan_prefix<T: DeserializeOwned>(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<T>> {
        let cf = self.get_cf(cf_name)?;
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));
        let mut out = Vec::new();
        for item in iter {
            let (key, value) = item.context("Failed to read iterator")?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push(
                postcard::from_bytes(&value)
                    .with_context(|| format!("Failed to deserialize {} record", cf_name))?,
            );
        }
        Ok(out)
    }
}

fn decode_height(bytes: &[u8]) -> Result<u64> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("Cursor must be 8 bytes (u64), got {}", bytes.len()))?;
    Ok(u64::from_be_bytes(arr))
}

impl CursorRepository for RocksStore {
    fn get_cursor(&self, name: &str) -> Result<Option<u64>> {
        let cf = self.get_cf(CF_CURSORS)?;
        match self
            .db
            .get_cf(cf, encode_cursor_key(name))
            .context("Failed to get cursor")?
        {
            Some(bytes) => Ok(Some(decode_height(&bytes)?)),
            None => Ok(None),
        }
    }

    fn set_cursor(&self, name: &str, height: u64) -> Result<()> {
        if let Some(current) = self.get_cursor(name)? {
            if height < current {
                anyhow::bail!(
                    "Cursor '{}' cannot move backwards ({} -> {})",
                    name,
                    current,
                    height
                );
            }
        }
        let cf = self.get_cf(CF_CURSORS)?;
        self.db
            .put_cf(cf, encode_cursor_key(name), height.to_be_bytes())
            .context("Failed to set cursor")?;
        Ok(())
    }

    fn ensure_cursor(&self, name: &str, from: u64) -> Result<u64> {
        let current = self.get_cursor(name)?.unwrap_or(0);
        let height = current.max(from);
        let cf = self.get_cf(CF_CURSORS)?;
        self.db
            .put_cf(cf, encode_cursor_key(name), height.to_be_bytes())
            .context("Failed to create cursor")?;
        Ok(height)
    }
}

impl ContractRepository for RocksStore {
    fn put_contract(&self, contract: &ContractRecord) -> Result<()> {
        let primary = encode_contract_key(&contract.tx_hash, contract.vout_idx);
        let value =
            postcard::to_allocvec(contract).context("Failed to serialize contract record")?;

        let mut batch = WriteBatch::default();
        batch.put_cf(self.get_cf(CF_CONTRACTS)?, &primary, &value);
        batch.put_cf(
            self.get_cf(CF_CONTRACT_INDEX)?,
            encode_contract_index_key(contract.contract_address),
            &primary,
        );
        self.db.write(batch).context("Failed to put contract")?;
        Ok(())
    }

    fn get_contract(&self, tx_hash: &str, vout_idx: u32) -> Result<Option<ContractRecord>> {
        self.get_record(CF_CONTRACTS, &encode_contract_key(tx_hash, vout_idx))
    }

    fn get_contract_by_address(&self, contract: Address) -> Result<Option<ContractRecord>> {
        let cf = self.get_cf(CF_CONTRACT_INDEX)?;
        match self
            .db
            .get_cf(cf, encode_contract_index_key(contract))
            .context("Failed to read contract index")?
        {
            Some(primary) => self.get_record(CF_CONTRACTS, &primary),
            None => Ok(None),
        }
    }

    fn list_contracts(&self) -> Result<Vec<ContractRecord>> {
        self.scan_prefix(CF_CONTRACTS, b"C")
    }
}

impl TransferRepository for RocksStore {
    fn put_transfer(&self, transfer: &TransferRecord) -> Result<()> {
        let key = encode_transfer_key(
            transfer.contract_address,
            transfer.block_height,
            &transfer.tx_hash,
            transfer.log_idx,
        );
        self.put_record(CF_TRANSFERS, &key, transfer)
    }

    fn get_transfer(
        &self,
        contract: Address,
        block_height: u64,
        tx_hash: &str,
        log_idx: u32,
    ) -> Result<Option<TransferRecord>> {
        let key = encode_transfer_key(contract, block_height, tx_hash, log_idx);
        self.get_record(CF_TRANSFERS, &key)
    }

    fn find_transfers(
        &self,
        contract: Address,
        filter: &TransferFilter,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<TransferRecord>, usize)> {
        let cf = self.get_cf(CF_TRANSFERS)?;
        let prefix = encode_transfer_prefix(contract);

        // Seek just past the newest admissible height and walk backwards
        let mut start = prefix.clone();
        start.extend_from_slice(&filter.to_block.unwrap_or(u64::MAX).to_be_bytes());
        start.push(0xff);

        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&start, Direction::Reverse));

        let mut page = Vec::new();
        let mut total = 0usize;
        for item in iter {
            let (key, value) = item.context("Failed to read iterator")?;
            if !key.starts_with(&prefix) {
                break;
            }
            let transfer: TransferRecord =
                postcard::from_bytes(&value).context("Failed to deserialize transfer record")?;
            if filter.from_block.map_or(false, |b| transfer.block_height < b) {
                break;
            }
            if !filter.matches(&transfer) {
                continue;
            }
            if total >= offset && page.len() < limit {
                page.push(transfer);
            }
            total += 1;
        }
        Ok((page, total))
    }

    fn count_transfers(&self, contract: Address) -> Result<usize> {
        let cf = self.get_cf(CF_TRANSFERS)?;
        let prefix = encode_transfer_prefix(contract);
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));
        let mut count = 0;
        for item in iter {
            let (key, _) = item.context("Failed to read iterator")?;
            if !key.starts_with(&prefix) {
                break;
            }
            count += 1;
        }
        Ok(count)
    }
}

impl TokenBalanceRepository for RocksStore {
    fn put_token_balance(&self, balance: &TokenBalanceRecord) -> Result<()> {
        let key = encode_token_balance_key(balance.contract_address, balance.address_eth);
        let previous: Option<TokenBalanceRecord> = self.get_record(CF_TOKEN_BALANCES, &key)?;
        let value =
            postcard::to_allocvec(balance).context("Failed to serialize token balance")?;

        let rank_cf = self.get_cf(CF_TOKEN_RANK)?;
        let mut batch = WriteBatch::default();
        if let Some(previous) = previous {
            batch.delete_cf(
                rank_cf,
                encode_token_rank_key(previous.contract_address, previous.amount, previous.address_eth),
            );
        }
        batch.put_cf(self.get_cf(CF_TOKEN_BALANCES)?, &key, &value);
        batch.put_cf(
            rank_cf,
            encode_token_rank_key(balance.contract_address, balance.amount, balance.address_eth),
            &value,
        );
        self.db.write(batch).context("Failed to put token balance")?;
        Ok(())
    }

    fn delete_token_balance(&self, contract: Address, holder: Address) -> Result<()> {
        let key = encode_token_balance_key(contract, holder);
        let previous: Option<TokenBalanceRecord> = self.get_record(CF_TOKEN_BALANCES, &key)?;
        let Some(previous) = previous else {
            return Ok(());
        };

        let mut batch = WriteBatch::default();
        batch.delete_cf(self.get_cf(CF_TOKEN_BALANCES)?, &key);
        batch.delete_cf(
            self.get_cf(CF_TOKEN_RANK)?,
            encode_token_rank_key(contract, previous.amount, holder),
        );
        self.db.write(batch).context("Failed to delete token balance")?;
        Ok(())
    }

    fn get_token_balance(
        &self,
        contract: Address,
        holder: Address,
    ) -> Result<Option<TokenBalanceRecord>> {
        self.get_record(CF_TOKEN_BALANCES, &encode_token_balance_key(contract, holder))
    }

    fn find_token_balances(
        &self,
        contract: Address,
        addresses: &[String],
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<TokenBalanceRecord>, usize)> {
        let cf = self.get_cf(CF_TOKEN_RANK)?;
        let prefix = encode_token_rank_prefix(contract);
        let mut start = prefix.clone();
        start.extend_from_slice(&[0xff; 52]);

        let wanted: HashSet<&str> = addresses.iter().map(String::as_str).collect();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&start, Direction::Reverse));

        let mut page = Vec::new();
        let mut total = 0usize;
        for item in iter {
            let (key, value) = item.context("Failed to read iterator")?;
            if !key.starts_with(&prefix) {
                break;
            }
            let balance: TokenBalanceRecord =
                postcard::from_bytes(&value).context("Failed to deserialize token balance")?;
            if !wanted.is_empty() && !wanted.contains(balance.address.as_str()) {
                continue;
            }
            if total >= offset && page.len() < limit {
                page.push(balance);
            }
            total += 1;
        }
        Ok((page, total))
    }

    fn count_holders(&self, contract: Address) -> Result<usize> {
        let cf = self.get_cf(CF_TOKEN_BALANCES)?;
        let prefix = encode_token_balance_prefix(contract);
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));
        let mut count = 0;
        for item in iter {
            let (key, _) = item.context("Failed to read iterator")?;
            if !key.starts_with(&prefix) {
                break;
            }
            count += 1;
        }
        Ok(count)
    }

    fn holder_counts(&self) -> Result<HashMap<Address, usize>> {
        let cf = self.get_cf(CF_TOKEN_BALANCES)?;
        let mut counts = HashMap::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, _) = item.context("Failed to read iterator")?;
            if key.len() != 41 {
                continue;
            }
            *counts.entry(Address::from_slice(&key[1..21])).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

impl DailyStatisticRepository for RocksStore {
    fn get_day(&self, date: &str) -> Result<Option<DailyStatistic>> {
        self.get_record(CF_DAILY, &encode_daily_key(date))
    }

    fn put_day(&self, day: &DailyStatistic) -> Result<()> {
        self.put_record(CF_DAILY, &encode_daily_key(&day.date), day)
    }

    fn days_since(&self, from_date: &str) -> Result<Vec<DailyStatistic>> {
        let cf = self.get_cf(CF_DAILY)?;
        let start = encode_daily_key(from_date);
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&start, Direction::Forward));
        let mut out = Vec::new();
        for item in iter {
            let (key, value) = item.context("Failed to read iterator")?;
            if key.first() != Some(&b'D') {
                break;
            }
            out.push(postcard::from_bytes(&value).context("Failed to deserialize day")?);
        }
        Ok(out)
    }
}

impl TotalStatisticRepository for RocksStore {
    fn get_total(&self, name: &str) -> Result<Option<TotalStatistic>> {
        self.get_record(CF_TOTALS, &encode_total_key(name))
    }

    fn put_total(&self, total: &TotalStatistic) -> Result<()> {
        self.put_record(CF_TOTALS, &encode_total_key(&total.name), total)
    }
}

impl AddressBalanceRepository for RocksStore {
    fn get_address_balance(&self, address: &str) -> Result<Option<AddressBalanceRecord>> {
        self.get_record(CF_ADDRESS_BALANCES, &encode_address_balance_key(address))
    }

    fn put_address_balance(&self, balance: &AddressBalanceRecord) -> Result<()> {
        let key = encode_address_balance_key(&balance.address);
        let previous = self.get_address_balance(&balance.address)?;
        let value =
            postcard::to_allocvec(balance).context("Failed to serialize address balance")?;

        let rank_cf = self.get_cf(CF_ADDRESS_RANK)?;
        let mut batch = WriteBatch::default();
        if let Some(previous) = previous {
            batch.delete_cf(
                rank_cf,
                encode_address_rank_key(previous.balance_sat, &previous.address),
            );
        }
        batch.put_cf(self.get_cf(CF_ADDRESS_BALANCES)?, &key, &value);
        batch.put_cf(
            rank_cf,
            encode_address_rank_key(balance.balance_sat, &balance.address),
            b"",
        );
        self.db.write(batch).context("Failed to put address balance")?;
        Ok(())
    }

    fn delete_address_balance(&self, address: &str) -> Result<()> {
        let Some(previous) = self.get_address_balance(address)? else {
            return Ok(());
        };
        let mut batch = WriteBatch::default();
        batch.delete_cf(
            self.get_cf(CF_ADDRESS_BALANCES)?,
            encode_address_balance_key(address),
        );
        batch.delete_cf(
            self.get_cf(CF_ADDRESS_RANK)?,
            encode_address_rank_key(previous.balance_sat, address),
        );
        self.db.write(batch).context("Failed to delete address balance")?;
        Ok(())
    }

    fn richest(&self, limit: usize) -> Result<Vec<AddressBalanceRecord>> {
        let cf = self.get_cf(CF_ADDRESS_RANK)?;
        let mut out = Vec::with_capacity(limit);
        for item in self.db.iterator_cf(cf, IteratorMode::End) {
            if out.len() >= limit {
                break;
            }
            let (key, _) = item.context("Failed to read iterator")?;
            if let Some((balance_sat, address)) = decode_address_rank_key(&key) {
                out.push(AddressBalanceRecord {
                    address,
                    balance_sat,
                });
            }
        }
        Ok(out)
    }

    fn count_richer_than(&self, balance_sat: u64) -> Result<usize> {
        let Some(floor) = balance_sat.checked_add(1) else {
            return Ok(0);
        };
        let cf = self.get_cf(CF_ADDRESS_RANK)?;
        let start = encode_address_rank_key(floor, "");
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&start, Direction::Forward));
        let mut count = 0;
        for item in iter {
            item.context("Failed to read iterator")?;
            count += 1;
        }
        Ok(count)
    }

    fn scan_balances(&self, visit: &mut dyn FnMut(&str, u64)) -> Result<()> {
        let cf = self.get_cf(CF_ADDRESS_RANK)?;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, _) = item.context("Failed to read iterator")?;
            if let Some((balance_sat, address)) = decode_address_rank_key(&key) {
                visit(&address, balance_sat);
            }
        }
        Ok(())
    }
}

impl MinedBlocksRepository for RocksStore {
    fn get_mined(&self, address: &str) -> Result<Option<MinedBlocksRecord>> {
        self.get_record(CF_MINED, &encode_mined_key(address))
    }

    fn put_mined(&self, record: &MinedBlocksRecord) -> Result<()> {
        self.put_record(CF_MINED, &encode_mined_key(&record.address), record)
    }

    fn mined_for(&self, addresses: &[String]) -> Result<Vec<MinedBlocksRecord>> {
        let mut out = Vec::new();
        for address in addresses {
            if let Some(record) = self.get_mined(address)? {
                out.push(record);
            }
        }
        Ok(out)
    }
}

/// Read the token balance of `holder` as a plain amount (zero when absent).
pub fn token_amount(
    store: &dyn TokenBalanceRepository,
    contract: Address,
    holder: Address,
) -> Result<U256> {
    Ok(store
        .get_token_balance(contract, holder)?
        .map_or(U256::ZERO, |b| b.amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = RocksStore::open(temp_dir.path()).unwrap();
        (store, temp_dir)
    }

    const TOKEN: Address = address!("64d7140c2a6c36a8a0b102ccd14a92f937db070f");
    const ALICE: Address = address!("e3ea0b4b2c2a1ac2a8e2c5b9f21d0cbb7bc6d4a1");
    const BOB: Address = address!("4f945852f10a35dbc434f1a957ecb7603b752922");

    fn transfer(height: u64, log_idx: u32, from: &str, to: &str) -> TransferRecord {
        TransferRecord {
            tx_hash: format!("{:064x}", height),
            log_idx,
            block_height: height,
            block_time: 1_000 + height,
            tx_time: 1_000 + height,
            contract_address: TOKEN,
            contract_address_base: "Qtoken".to_string(),
            from_eth: None,
            to_eth: None,
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            value: U256::from(height),
        }
    }

    fn holder(holder: Address, native: &str, amount: u64) -> TokenBalanceRecord {
        TokenBalanceRecord {
            contract_address: TOKEN,
            address_eth: holder,
            address: native.to_string(),
            amount: U256::from(amount),
        }
    }

    #[test]
    fn test_cursor_ensure_and_advance() {
        let (store, _temp_dir) = create_test_store();

        assert_eq!(store.get_cursor("tokens").unwrap(), None);
        assert_eq!(store.ensure_cursor("tokens", 0).unwrap(), 0);
        assert_eq!(store.get_cursor("tokens").unwrap(), Some(0));

        // Configured start height raises a fresh cursor
        assert_eq!(store.ensure_cursor("tokens", 500).unwrap(), 500);
        store.set_cursor("tokens", 700).unwrap();

        // But never lowers an existing one
        assert_eq!(store.ensure_cursor("tokens", 500).unwrap(), 700);
        assert!(store.set_cursor("tokens", 600).is_err());
        assert_eq!(store.get_cursor("tokens").unwrap(), Some(700));
    }

    #[test]
    fn test_contract_lookup_by_address() {
        let (store, _temp_dir) = create_test_store();
        let mut contract = ContractRecord::new(100, "aa".repeat(32), 0, TOKEN, "Qtoken".into());
        contract.symbol = "TKN".to_string();
        store.put_contract(&contract).unwrap();

        let by_key = store.get_contract(&"aa".repeat(32), 0).unwrap().unwrap();
        assert_eq!(by_key, contract);
        let by_addr = store.get_contract_by_address(TOKEN).unwrap().unwrap();
        assert_eq!(by_addr.symbol, "TKN");
        assert!(store.get_contract_by_address(ALICE).unwrap().is_none());

        // Upsert leaves exactly one row
        contract.total_supply = U256::from(42u64);
        store.put_contract(&contract).unwrap();
        let all = store.list_contracts().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].total_supply, U256::from(42u64));
    }

    #[test]
    fn test_transfers_newest_first_with_filters() {
        let (store, _temp_dir) = create_test_store();
        for height in [10u64, 20, 30, 40] {
            store.put_transfer(&transfer(height, 0, "Qa", "Qb")).unwrap();
        }
        store.put_transfer(&transfer(30, 1, "Qc", "Qa")).unwrap();
        // Replay does not duplicate
        store.put_transfer(&transfer(30, 1, "Qc", "Qa")).unwrap();

        let (all, total) = store
            .find_transfers(TOKEN, &TransferFilter::default(), 0, 10)
            .unwrap();
        assert_eq!(total, 5);
        let heights: Vec<u64> = all.iter().map(|t| t.block_height).collect();
        assert_eq!(heights, vec![40, 30, 30, 20, 10]);

        let range = TransferFilter {
            from_block: Some(20),
            to_block: Some(30),
            ..TransferFilter::default()
        };
        let (page, total) = store.find_transfers(TOKEN, &range, 1, 1).unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].block_height, 30);

        let by_address = TransferFilter {
            addresses: vec!["Qc".to_string()],
            ..TransferFilter::default()
        };
        let (page, total) = store.find_transfers(TOKEN, &by_address, 0, 10).unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].log_idx, 1);

        let by_time = TransferFilter {
            from_time: Some(1_035),
            ..TransferFilter::default()
        };
        let (_, total) = store.find_transfers(TOKEN, &by_time, 0, 10).unwrap();
        assert_eq!(total, 1);

        assert_eq!(store.count_transfers(TOKEN).unwrap(), 5);
        assert_eq!(store.count_transfers(ALICE).unwrap(), 0);
    }

    #[test]
    fn test_token_balances_ranked_and_deleted() {
        let (store, _temp_dir) = create_test_store();
        store.put_token_balance(&holder(ALICE, "Qalice", 50)).unwrap();
        store.put_token_balance(&holder(BOB, "Qbob", 70)).unwrap();

        let (page, total) = store.find_token_balances(TOKEN, &[], 0, 10).unwrap();
        assert_eq!(total, 2);
        assert_eq!(page[0].address, "Qbob");

        // Moving a balance moves its rank entry
        store.put_token_balance(&holder(ALICE, "Qalice", 90)).unwrap();
        let (page, total) = store.find_token_balances(TOKEN, &[], 0, 10).unwrap();
        assert_eq!(total, 2);
        assert_eq!(page[0].address, "Qalice");
        assert_eq!(page[0].amount, U256::from(90u64));

        let (page, _) = store
            .find_token_balances(TOKEN, &["Qbob".to_string()], 0, 10)
            .unwrap();
        assert_eq!(page.len(), 1);

        store.delete_token_balance(TOKEN, ALICE).unwrap();
        assert!(store.get_token_balance(TOKEN, ALICE).unwrap().is_none());
        let (_, total) = store.find_token_balances(TOKEN, &[], 0, 10).unwrap();
        assert_eq!(total, 1);
        assert_eq!(store.count_holders(TOKEN).unwrap(), 1);
        assert_eq!(store.holder_counts().unwrap().get(&TOKEN), Some(&1));
        assert_eq!(token_amount(&store, TOKEN, BOB).unwrap(), U256::from(70u64));
    }

    #[test]
    fn test_days_since() {
        let (store, _temp_dir) = create_test_store();
        for date in ["2024-01-30", "2024-02-01", "2024-01-31"] {
            store.put_day(&DailyStatistic::empty(date.to_string())).unwrap();
        }
        let days = store.days_since("2024-01-31").unwrap();
        let dates: Vec<&str> = days.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-31", "2024-02-01"]);
    }

    #[test]
    fn test_address_balance_ranking() {
        let (store, _temp_dir) = create_test_store();
        for (address, sats) in [("Qa", 100u64), ("Qb", 300), ("Qc", 200)] {
            store
                .put_address_balance(&AddressBalanceRecord {
                    address: address.to_string(),
                    balance_sat: sats,
                })
                .unwrap();
        }
        store
            .put_address_balance(&AddressBalanceRecord {
                address: "Qa".to_string(),
                balance_sat: 400,
            })
            .unwrap();

        let top: Vec<String> = store.richest(2).unwrap().into_iter().map(|r| r.address).collect();
        assert_eq!(top, vec!["Qa".to_string(), "Qb".to_string()]);
        assert_eq!(store.count_richer_than(200).unwrap(), 2);
        assert_eq!(store.count_richer_than(199).unwrap(), 3);
        assert_eq!(store.count_richer_than(u64::MAX).unwrap(), 0);

        store.delete_address_balance("Qb").unwrap();
        let mut seen = Vec::new();
        store
            .scan_balances(&mut |address, sats| seen.push((address.to_string(), sats)))
            .unwrap();
        assert_eq!(seen, vec![("Qc".to_string(), 200), ("Qa".to_string(), 400)]);
    }

    #[test]
    fn test_mined_for() {
        let (store, _temp_dir) = create_test_store();
        store
            .put_mined(&MinedBlocksRecord {
                address: "Qminer".to_string(),
                count: 3,
                last_height: 9,
            })
            .unwrap();
        let found = store
            .mined_for(&["Qminer".to_string(), "Qnobody".to_string()])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].count, 3);
    }
}
