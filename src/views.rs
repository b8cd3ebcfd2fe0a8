//! Read accessors over the materialized collections
//!
//! [`ExplorerViews`] is what an API layer sits on: lookups, filtered and
//! paginated listings, and the derived statistic snapshots. Errors are
//! categorized by [`ViewError`] so callers can map them to status codes.

use crate::address::{decode_native_address, native_address, parse_hex_address, to_hex};
use crate::address_balance::{
    summarize, BalanceInterval, BalanceSummary, PriceSource, RicherThan, SummaryCache,
};
use crate::cache::{DayRollup, RecentBlocks};
use crate::records::{
    ContractRecord, DailyStatistic, MinedBlocksRecord, TokenBalanceRecord, TransferRecord,
};
use crate::statistics::STATISTICS;
use crate::store::{
    token_amount, AddressBalanceRepository, ContractRepository, CursorRepository,
    DailyStatisticRepository, MinedBlocksRepository, TokenBalanceRepository, TransferFilter,
    TransferRepository,
};
use crate::supply;
use crate::types::sat_to_coin_text;
use alloy_primitives::Address;
use chrono::{DateTime, Days, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

pub const DEFAULT_STATISTICS_DAYS: u32 = 365;
pub const MAX_STATISTICS_DAYS: u32 = 730;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ViewResult<T> = std::result::Result<T, ViewError>;

/// Offset/limit window with the limit clamped to `[1, max_page_size]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: usize,
    pub limit: usize,
}

impl Pagination {
    pub fn new(offset: Option<usize>, limit: Option<usize>, max_page_size: usize) -> Self {
        let max = max_page_size.max(1);
        Self {
            offset: offset.unwrap_or(0),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, max),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

/// Number of days requested by a statistics query.
///
/// `"all"` and oversized values select the maximum; anything missing, non
/// numeric or non positive falls back to the default.
pub fn parse_time_span(days: Option<&str>) -> u32 {
    match days.map(str::trim) {
        Some("all") => MAX_STATISTICS_DAYS,
        Some(text) => match text.parse::<u64>() {
            Ok(0) | Err(_) => DEFAULT_STATISTICS_DAYS,
            Ok(n) => n.min(u64::from(MAX_STATISTICS_DAYS)) as u32,
        },
        None => DEFAULT_STATISTICS_DAYS,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractView {
    pub contract_address: String,
    pub contract_address_base: String,
    pub tx_hash: String,
    pub vout_idx: u32,
    pub block_height: u64,
    pub symbol: String,
    pub name: String,
    pub version: String,
    pub decimals: u8,
    pub total_supply: String,
    pub exception: bool,
}

impl From<&ContractRecord> for ContractView {
    fn from(record: &ContractRecord) -> Self {
        Self {
            contract_address: to_hex(record.contract_address),
            contract_address_base: record.contract_address_base.clone(),
            tx_hash: record.tx_hash.clone(),
            vout_idx: record.vout_idx,
            block_height: record.block_height,
            symbol: record.symbol.clone(),
            name: record.name.clone(),
            version: record.version.clone(),
            decimals: record.decimals,
            total_supply: record.total_supply.to_string(),
            exception: record.exception,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferView {
    pub tx_hash: String,
    pub log_idx: u32,
    pub block_height: u64,
    pub block_time: u64,
    pub tx_time: u64,
    pub contract_address: String,
    pub contract_address_base: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub from_eth: Option<String>,
    pub to_eth: Option<String>,
    pub value: String,
}

impl From<&TransferRecord> for TransferView {
    fn from(record: &TransferRecord) -> Self {
        Self {
            tx_hash: record.tx_hash.clone(),
            log_idx: record.log_idx,
            block_height: record.block_height,
            block_time: record.block_time,
            tx_time: record.tx_time,
            contract_address: to_hex(record.contract_address),
            contract_address_base: record.contract_address_base.clone(),
            from: record.from.clone(),
            to: record.to.clone(),
            from_eth: record.from_eth.map(to_hex),
            to_eth: record.to_eth.map(to_hex),
            value: record.value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceView {
    pub contract_address: String,
    pub address: String,
    pub address_eth: String,
    pub amount: String,
}

impl From<&TokenBalanceRecord> for BalanceView {
    fn from(record: &TokenBalanceRecord) -> Self {
        Self {
            contract_address: to_hex(record.contract_address),
            address: record.address.clone(),
            address_eth: to_hex(record.address_eth),
            amount: record.amount.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenSummary {
    pub contract: ContractView,
    pub transfers_count: usize,
    pub holders_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenListEntry {
    pub contract: ContractView,
    pub holders_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RichestEntry {
    pub address: String,
    /// Coins
    pub balance: String,
    pub balance_sat: u64,
    pub blocks_mined: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplyView {
    pub height: u64,
    /// Coins
    pub total: String,
    /// Coins
    pub circulating: String,
}

pub struct ExplorerViews {
    cursors: Arc<dyn CursorRepository>,
    contracts: Arc<dyn ContractRepository>,
    transfers: Arc<dyn TransferRepository>,
    token_balances: Arc<dyn TokenBalanceRepository>,
    days: Arc<dyn DailyStatisticRepository>,
    address_balances: Arc<dyn AddressBalanceRepository>,
    mined: Arc<dyn MinedBlocksRepository>,
    address_version: u8,
    max_page_size: usize,
    price: Option<Arc<dyn PriceSource>>,
    summary: Option<Arc<SummaryCache>>,
    recent: Option<Arc<RecentBlocks>>,
}

impl ExplorerViews {
    pub fn new<S>(store: Arc<S>, address_version: u8, max_page_size: usize) -> Self
    where
        S: CursorRepository
            + ContractRepository
            + TransferRepository
            + TokenBalanceRepository
            + DailyStatisticRepository
            + AddressBalanceRepository
            + MinedBlocksRepository
            + 'static,
    {
        Self {
            cursors: store.clone(),
            contracts: store.clone(),
            transfers: store.clone(),
            token_balances: store.clone(),
            days: store.clone(),
            address_balances: store.clone(),
            mined: store,
            address_version,
            max_page_size,
            price: None,
            summary: None,
            recent: None,
        }
    }

    /// Price used for richer-than counts computed on demand.
    pub fn with_price(mut self, price: Arc<dyn PriceSource>) -> Self {
        self.price = Some(price);
        self
    }

    /// Serve balance snapshots from an aggregator's cache.
    pub fn with_summary_cache(mut self, summary: Arc<SummaryCache>) -> Self {
        self.summary = Some(summary);
        self
    }

    pub fn with_recent_blocks(mut self, recent: Arc<RecentBlocks>) -> Self {
        self.recent = Some(recent);
        self
    }

    pub fn page(&self, offset: Option<usize>, limit: Option<usize>) -> Pagination {
        Pagination::new(offset, limit, self.max_page_size)
    }

    /// Parse a VM (hex) or native (base58) address.
    pub fn parse_address(&self, input: &str) -> ViewResult<Address> {
        let input = input.trim();
        if let Some(address) = parse_hex_address(input) {
            return Ok(address);
        }
        match decode_native_address(input) {
            Some((version, address)) if version == self.address_version => Ok(address),
            Some((version, _)) => Err(ViewError::InvalidInput(format!(
                "Address {} has version {:#04x}, expected {:#04x}",
                input, version, self.address_version
            ))),
            None => Err(ViewError::InvalidInput(format!("Not an address: {}", input))),
        }
    }

    /// Native form of an address given in either form.
    fn native_form(&self, input: &str) -> ViewResult<String> {
        self.parse_address(input)
            .map(|address| native_address(address, self.address_version))
    }

    fn tracked(&self, contract: &str) -> ViewResult<ContractRecord> {
        let address = self.parse_address(contract)?;
        self.contracts
            .get_contract_by_address(address)?
            .ok_or_else(|| ViewError::NotFound(format!("Contract {}", contract)))
    }

    /// Contract by hex address, native address or symbol (case-insensitive).
    pub fn contract(&self, query: &str) -> ViewResult<ContractView> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ViewError::InvalidInput("Empty contract query".to_string()));
        }
        if let Ok(address) = self.parse_address(query) {
            return self
                .contracts
                .get_contract_by_address(address)?
                .map(|c| ContractView::from(&c))
                .ok_or_else(|| ViewError::NotFound(format!("Contract {}", query)));
        }
        self.contracts
            .list_contracts()?
            .iter()
            .find(|c| !c.exception && c.symbol.eq_ignore_ascii_case(query))
            .map(ContractView::from)
            .ok_or_else(|| ViewError::NotFound(format!("Contract {}", query)))
    }

    /// Tokens whose address equals, or whose symbol or name contains, `query`.
    pub fn search_tokens(&self, query: &str) -> ViewResult<Vec<ContractView>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ViewError::InvalidInput("Empty search query".to_string()));
        }
        let address = self.parse_address(query).ok();
        let needle = query.to_lowercase();

        Ok(self
            .contracts
            .list_contracts()?
            .iter()
            .filter(|c| !c.exception)
            .filter(|c| match address {
                Some(address) => c.contract_address == address,
                None => {
                    c.symbol.to_lowercase().contains(&needle)
                        || c.name.to_lowercase().contains(&needle)
                }
            })
            .map(ContractView::from)
            .collect())
    }

    pub fn token_summary(&self, contract: &str) -> ViewResult<TokenSummary> {
        let record = self.tracked(contract)?;
        Ok(TokenSummary {
            transfers_count: self.transfers.count_transfers(record.contract_address)?,
            holders_count: self.token_balances.count_holders(record.contract_address)?,
            contract: ContractView::from(&record),
        })
    }

    /// Transfers of a tracked contract, newest first.
    ///
    /// Filter addresses may be given in either form.
    pub fn transfers(
        &self,
        contract: &str,
        mut filter: TransferFilter,
        page: Pagination,
    ) -> ViewResult<Page<TransferView>> {
        let record = self.tracked(contract)?;

        if let (Some(from), Some(to)) = (filter.from_block, filter.to_block) {
            if from > to {
                return Err(ViewError::InvalidInput(format!("Block range {}..{}", from, to)));
            }
        }
        if let (Some(from), Some(to)) = (filter.from_time, filter.to_time) {
            if from > to {
                return Err(ViewError::InvalidInput(format!("Time range {}..{}", from, to)));
            }
        }
        filter.addresses = filter
            .addresses
            .iter()
            .map(|a| self.native_form(a))
            .collect::<ViewResult<Vec<_>>>()?;

        let (items, total) = self.transfers.find_transfers(
            record.contract_address,
            &filter,
            page.offset,
            page.limit,
        )?;
        Ok(Page {
            items: items.iter().map(TransferView::from).collect(),
            total,
            offset: page.offset,
            limit: page.limit,
        })
    }

    /// Holders of a tracked contract, richest first.
    pub fn balances(
        &self,
        contract: &str,
        addresses: &[String],
        page: Pagination,
    ) -> ViewResult<Page<BalanceView>> {
        let record = self.tracked(contract)?;
        let addresses = addresses
            .iter()
            .map(|a| self.native_form(a))
            .collect::<ViewResult<Vec<_>>>()?;

        let (items, total) = self.token_balances.find_token_balances(
            record.contract_address,
            &addresses,
            page.offset,
            page.limit,
        )?;
        Ok(Page {
            items: items.iter().map(BalanceView::from).collect(),
            total,
            offset: page.offset,
            limit: page.limit,
        })
    }

    /// Token amount held by `holder`, "0" when it holds none.
    pub fn token_balance(&self, contract: &str, holder: &str) -> ViewResult<String> {
        let record = self.tracked(contract)?;
        let holder = self.parse_address(holder)?;
        let amount = token_amount(self.token_balances.as_ref(), record.contract_address, holder)?;
        Ok(amount.to_string())
    }

    /// Tokens with their holder counts, most held first.
    pub fn tokens(&self, page: Pagination) -> ViewResult<Page<TokenListEntry>> {
        let holders: HashMap<Address, usize> = self.token_balances.holder_counts()?;
        let mut entries: Vec<TokenListEntry> = self
            .contracts
            .list_contracts()?
            .iter()
            .filter(|c| !c.exception)
            .map(|c| TokenListEntry {
                holders_count: holders.get(&c.contract_address).copied().unwrap_or(0),
                contract: ContractView::from(c),
            })
            .collect();
        entries.sort_by(|a, b| {
            b.holders_count
                .cmp(&a.holders_count)
                .then_with(|| a.contract.block_height.cmp(&b.contract.block_height))
        });

        let total = entries.len();
        let items = entries.into_iter().skip(page.offset).take(page.limit).collect();
        Ok(Page {
            items,
            total,
            offset: page.offset,
            limit: page.limit,
        })
    }

    /// Daily statistics of the last `days` days, oldest first.
    pub fn daily_statistics(&self, days: u32) -> ViewResult<Vec<DailyStatistic>> {
        self.daily_statistics_at(days, Utc::now())
    }

    pub fn daily_statistics_at(
        &self,
        days: u32,
        now: DateTime<Utc>,
    ) -> ViewResult<Vec<DailyStatistic>> {
        let days = days.clamp(1, MAX_STATISTICS_DAYS);
        let from = now
            .date_naive()
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .ok_or_else(|| ViewError::InvalidInput(format!("Time span of {} days", days)))?;
        Ok(self.days.days_since(&from.format("%Y-%m-%d").to_string())?)
    }

    fn balance_summary(&self) -> ViewResult<Arc<BalanceSummary>> {
        if let Some(cache) = &self.summary {
            return Ok(cache.get());
        }
        let no_price = crate::address_balance::FixedPrice::new(None);
        let price: &dyn PriceSource = match &self.price {
            Some(price) => price.as_ref(),
            None => &no_price,
        };
        Ok(Arc::new(summarize(self.address_balances.as_ref(), price)?))
    }

    pub fn richer_than(&self) -> ViewResult<Vec<RicherThan>> {
        Ok(self.balance_summary()?.richer_than.clone())
    }

    pub fn balance_intervals(&self) -> ViewResult<Vec<BalanceInterval>> {
        Ok(self.balance_summary()?.intervals.clone())
    }

    /// Top balances joined with their mined-block counts.
    pub fn richest(&self) -> ViewResult<Vec<RichestEntry>> {
        let summary = self.balance_summary()?;
        let addresses: Vec<String> = summary.richest.iter().map(|b| b.address.clone()).collect();
        let mined: HashMap<String, u64> = self
            .mined
            .mined_for(&addresses)?
            .into_iter()
            .map(|m| (m.address, m.count))
            .collect();

        Ok(summary
            .richest
            .iter()
            .map(|b| RichestEntry {
                address: b.address.clone(),
                balance: sat_to_coin_text(b.balance_sat),
                balance_sat: b.balance_sat,
                blocks_mined: mined.get(&b.address).copied().unwrap_or(0),
            })
            .collect())
    }

    pub fn mined_blocks(&self, addresses: &[String]) -> ViewResult<Vec<MinedBlocksRecord>> {
        if addresses.is_empty() {
            return Err(ViewError::InvalidInput("No addresses given".to_string()));
        }
        Ok(self.mined.mined_for(addresses)?)
    }

    /// Supply at the statistics aggregator's height.
    pub fn supply(&self) -> ViewResult<SupplyView> {
        let height = self.cursors.get_cursor(STATISTICS)?.unwrap_or(0);
        Ok(SupplyView {
            height,
            total: sat_to_coin_text(supply::total_supply(height)),
            circulating: sat_to_coin_text(supply::circulating_supply(height)),
        })
    }

    pub fn last_24h(&self) -> ViewResult<DayRollup> {
        self.recent
            .as_ref()
            .map(|recent| recent.rollup())
            .ok_or_else(|| ViewError::NotFound("24h figures are kept by the running indexer".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address_balance::FixedPrice;
    use crate::records::AddressBalanceRecord;
    use crate::store::RocksStore;
    use alloy_primitives::{address, U256};
    use bigdecimal::BigDecimal;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const VERSION: u8 = 0x3a;
    const TOKEN: Address = address!("64d7140c2a6c36a8a0b102ccd14a92f937db070f");
    const HOLDER: Address = address!("4f945852f10a35dbc434f1a957ecb7603b752922");

    fn create_test_store() -> (Arc<RocksStore>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = RocksStore::open(temp_dir.path()).unwrap();
        (Arc::new(store), temp_dir)
    }

    fn seed_token(store: &RocksStore) {
        let mut contract = ContractRecord::new(
            100,
            "ab".repeat(32),
            0,
            TOKEN,
            native_address(TOKEN, VERSION),
        );
        contract.symbol = "TKN".to_string();
        contract.name = "Test Token".to_string();
        contract.total_supply = U256::from(10u64).pow(U256::from(30u64));
        store.put_contract(&contract).unwrap();

        for (height, log_idx) in [(101u64, 0u32), (102, 0), (103, 1)] {
            store
                .put_transfer(&TransferRecord {
                    tx_hash: format!("{:064x}", height),
                    log_idx,
                    block_height: height,
                    block_time: height * 100,
                    tx_time: height * 100,
                    contract_address: TOKEN,
                    contract_address_base: native_address(TOKEN, VERSION),
                    from_eth: None,
                    to_eth: Some(HOLDER),
                    from: None,
                    to: Some(native_address(HOLDER, VERSION)),
                    value: U256::from(height),
                })
                .unwrap();
        }
        store
            .put_token_balance(&TokenBalanceRecord {
                contract_address: TOKEN,
                address_eth: HOLDER,
                address: native_address(HOLDER, VERSION),
                amount: U256::from(306u64),
            })
            .unwrap();
    }

    fn views(store: &Arc<RocksStore>) -> ExplorerViews {
        ExplorerViews::new(store.clone(), VERSION, MAX_PAGE_SIZE)
    }

    #[test]
    fn test_pagination_clamps_limit() {
        assert_eq!(Pagination::new(None, None, 100), Pagination { offset: 0, limit: 20 });
        assert_eq!(Pagination::new(Some(5), Some(0), 100).limit, 1);
        assert_eq!(Pagination::new(None, Some(500), 100).limit, 100);
    }

    #[test]
    fn test_parse_time_span() {
        assert_eq!(parse_time_span(None), 365);
        assert_eq!(parse_time_span(Some("all")), 730);
        assert_eq!(parse_time_span(Some("9999")), 730);
        assert_eq!(parse_time_span(Some("30")), 30);
        assert_eq!(parse_time_span(Some("-3")), 365);
        assert_eq!(parse_time_span(Some("soon")), 365);
    }

    #[test]
    fn test_contract_lookup_by_any_form() {
        let (store, _temp_dir) = create_test_store();
        seed_token(&store);
        let views = views(&store);

        let by_hex = views.contract(&to_hex(TOKEN)).unwrap();
        let by_native = views.contract(&native_address(TOKEN, VERSION)).unwrap();
        let by_symbol = views.contract("tkn").unwrap();
        assert_eq!(by_hex, by_native);
        assert_eq!(by_hex, by_symbol);
        assert_eq!(by_hex.total_supply, format!("1{}", "0".repeat(30)));

        assert!(matches!(views.contract("NOPE"), Err(ViewError::NotFound(_))));
        assert!(matches!(views.contract(" "), Err(ViewError::InvalidInput(_))));
        assert_eq!(views.search_tokens("test").unwrap().len(), 1);
        assert!(views.search_tokens("other").unwrap().is_empty());
    }

    #[test]
    fn test_native_address_with_foreign_version_is_rejected() {
        let (store, _temp_dir) = create_test_store();
        let views = views(&store);
        let testnet = native_address(TOKEN, 0x78);
        assert!(matches!(views.parse_address(&testnet), Err(ViewError::InvalidInput(_))));
    }

    #[test]
    fn test_token_summary_and_pages() {
        let (store, _temp_dir) = create_test_store();
        seed_token(&store);
        let views = views(&store);

        let summary = views.token_summary(&to_hex(TOKEN)).unwrap();
        assert_eq!(summary.transfers_count, 3);
        assert_eq!(summary.holders_count, 1);

        let page = views
            .transfers(&to_hex(TOKEN), TransferFilter::default(), views.page(None, Some(2)))
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].block_height, 103);

        let filter = TransferFilter {
            addresses: vec![to_hex(HOLDER)],
            from_block: Some(102),
            ..TransferFilter::default()
        };
        let page = views.transfers(&to_hex(TOKEN), filter, views.page(None, None)).unwrap();
        assert_eq!(page.total, 2);

        let bad_range = TransferFilter {
            from_block: Some(5),
            to_block: Some(4),
            ..TransferFilter::default()
        };
        assert!(matches!(
            views.transfers(&to_hex(TOKEN), bad_range, views.page(None, None)),
            Err(ViewError::InvalidInput(_))
        ));

        let balances = views.balances(&to_hex(TOKEN), &[], views.page(None, None)).unwrap();
        assert_eq!(balances.items[0].amount, "306");
        assert_eq!(views.token_balance(&to_hex(TOKEN), &to_hex(HOLDER)).unwrap(), "306");
        assert_eq!(views.token_balance(&to_hex(TOKEN), &to_hex(TOKEN)).unwrap(), "0");

        let tokens = views.tokens(views.page(None, None)).unwrap();
        assert_eq!(tokens.total, 1);
        assert_eq!(tokens.items[0].holders_count, 1);
    }

    #[test]
    fn test_daily_statistics_window() {
        let (store, _temp_dir) = create_test_store();
        for date in ["2024-01-01", "2024-01-09", "2024-01-10"] {
            store.put_day(&DailyStatistic::empty(date.to_string())).unwrap();
        }
        let views = views(&store);
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();

        let days = views.daily_statistics_at(2, now).unwrap();
        let dates: Vec<&str> = days.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-09", "2024-01-10"]);
        assert_eq!(views.daily_statistics_at(365, now).unwrap().len(), 3);
    }

    #[test]
    fn test_richest_joined_with_mined_blocks() {
        let (store, _temp_dir) = create_test_store();
        for (address, balance_sat) in [("Qa", 5 * crate::types::COIN), ("Qb", 7)] {
            store
                .put_address_balance(&AddressBalanceRecord {
                    address: address.to_string(),
                    balance_sat,
                })
                .unwrap();
        }
        store
            .put_mined(&MinedBlocksRecord {
                address: "Qa".to_string(),
                count: 3,
                last_height: 10,
            })
            .unwrap();

        let views = views(&store)
            .with_price(Arc::new(FixedPrice::new(Some(BigDecimal::from(1)))));
        let richest = views.richest().unwrap();
        assert_eq!(richest[0].address, "Qa");
        assert_eq!(richest[0].balance, "5");
        assert_eq!(richest[0].blocks_mined, 3);
        assert_eq!(richest[1].blocks_mined, 0);

        // 1 USD at 1 USD/coin
        assert_eq!(views.richer_than().unwrap()[0].count_addresses, 1);
        assert_eq!(views.balance_intervals().unwrap()[0].count, 1);
        assert!(matches!(views.mined_blocks(&[]), Err(ViewError::InvalidInput(_))));
    }

    #[test]
    fn test_supply_follows_statistics_cursor() {
        let (store, _temp_dir) = create_test_store();
        store.ensure_cursor(STATISTICS, 5_000).unwrap();
        let views = views(&store);

        let supply = views.supply().unwrap();
        assert_eq!(supply.height, 5_000);
        assert_eq!(supply.total, "100000000");
        assert_eq!(supply.circulating, "88000000");
        assert!(matches!(views.last_24h(), Err(ViewError::NotFound(_))));
    }
}
