//! Native address balance aggregator
//!
//! Mirrors the node's confirmed balance of every address a block touches and,
//! after each catch-up pass, rebuilds the derived summaries: a log-scale
//! balance histogram, richer-than-USD counts and the top balance list.

use crate::chain::ChainSource;
use crate::records::AddressBalanceRecord;
use crate::store::AddressBalanceRepository;
use crate::tracker::BlockProcessor;
use crate::types::COIN;
use anyhow::{Context, Result};
use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Cursor name of the address balance aggregator.
pub const ADDRESS_BALANCE: &str = "address_balance";

/// Upper border of the first histogram bucket (0.001 coin).
pub const MIN_BORDER_SAT: u64 = COIN / 1_000;

/// USD thresholds of the richer-than counts.
pub const RICHER_THAN_USD: [u64; 7] = [1, 100, 1_000, 10_000, 100_000, 1_000_000, 10_000_000];

/// Length of the richest list.
pub const RICHEST_LIMIT: usize = 100;

/// Current coin price in USD.
pub trait PriceSource: Send + Sync {
    /// `None` when no price is known.
    fn usd_price(&self) -> Option<BigDecimal>;
}

/// Price set once from configuration.
pub struct FixedPrice(Option<BigDecimal>);

impl FixedPrice {
    pub fn new(price: Option<BigDecimal>) -> Self {
        Self(price)
    }
}

impl PriceSource for FixedPrice {
    fn usd_price(&self) -> Option<BigDecimal> {
        self.0.clone()
    }
}

/// Histogram bucket `(min_sat, max_sat]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceInterval {
    pub min_sat: u64,
    pub max_sat: u64,
    pub count: u64,
    pub sum_sat: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RicherThan {
    pub amount_usd: u64,
    pub count_addresses: usize,
}

/// Derived views over all address balances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BalanceSummary {
    pub intervals: Vec<BalanceInterval>,
    /// Empty when no positive price is available
    pub richer_than: Vec<RicherThan>,
    pub richest: Vec<AddressBalanceRecord>,
}

/// Bucket borders: `(0, MIN]` then ×10 per bucket until the maximum is covered.
fn interval_borders(max_balance: u64) -> Vec<(u64, u64)> {
    let mut borders = vec![(0, MIN_BORDER_SAT)];
    let mut next = MIN_BORDER_SAT;
    while max_balance >= next {
        let prev = next;
        next = next.saturating_mul(10);
        borders.push((prev, next));
        if next == u64::MAX {
            break;
        }
    }
    borders
}

/// Compute the full summary from the current snapshot.
pub fn summarize(
    balances: &dyn AddressBalanceRepository,
    price: &dyn PriceSource,
) -> Result<BalanceSummary> {
    let richest = balances.richest(RICHEST_LIMIT)?;

    let mut intervals: Vec<BalanceInterval> = match richest.first() {
        Some(top) => interval_borders(top.balance_sat)
            .into_iter()
            .map(|(min_sat, max_sat)| BalanceInterval {
                min_sat,
                max_sat,
                count: 0,
                sum_sat: 0,
            })
            .collect(),
        None => Vec::new(),
    };
    if !intervals.is_empty() {
        balances.scan_balances(&mut |_, balance| {
            if let Some(bucket) = intervals
                .iter_mut()
                .find(|i| balance > i.min_sat && balance <= i.max_sat)
            {
                bucket.count += 1;
                bucket.sum_sat += u128::from(balance);
            }
        })?;
    }

    let mut richer_than = Vec::new();
    if let Some(price) = price.usd_price().filter(|p| *p > BigDecimal::from(0)) {
        for amount_usd in RICHER_THAN_USD {
            let threshold = (BigDecimal::from(amount_usd * COIN) / price.clone())
                .with_scale(0)
                .to_u64()
                .unwrap_or(u64::MAX);
            richer_than.push(RicherThan {
                amount_usd,
                count_addresses: balances.count_richer_than(threshold)?,
            });
        }
    }

    Ok(BalanceSummary {
        intervals,
        richer_than,
        richest,
    })
}

/// Latest summary, swapped wholesale after each pass.
#[derive(Default)]
pub struct SummaryCache {
    current: RwLock<Arc<BalanceSummary>>,
}

impl SummaryCache {
    pub fn get(&self) -> Arc<BalanceSummary> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, summary: BalanceSummary) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(summary);
    }
}

pub struct AddressBalanceAggregator {
    chain: Arc<dyn ChainSource>,
    balances: Arc<dyn AddressBalanceRepository>,
    price: Arc<dyn PriceSource>,
    summary: Arc<SummaryCache>,
}

impl AddressBalanceAggregator {
    pub fn new<S>(chain: Arc<dyn ChainSource>, store: Arc<S>, price: Arc<dyn PriceSource>) -> Self
    where
        S: AddressBalanceRepository + 'static,
    {
        Self {
            chain,
            balances: store,
            price,
            summary: Arc::new(SummaryCache::default()),
        }
    }

    pub fn summary_cache(&self) -> Arc<SummaryCache> {
        self.summary.clone()
    }

    /// Rebuild the summaries from the stored snapshot.
    pub fn refresh_summary(&self) -> Result<()> {
        let summary = summarize(self.balances.as_ref(), self.price.as_ref())?;
        debug!(
            intervals = summary.intervals.len(),
            richest = summary.richest.len(),
            "Rebuilt balance summary"
        );
        self.summary.replace(summary);
        Ok(())
    }
}

#[async_trait]
impl BlockProcessor for AddressBalanceAggregator {
    fn name(&self) -> &'static str {
        ADDRESS_BALANCE
    }

    async fn process_block(&self, height: u64) -> Result<()> {
        let block = self
            .chain
            .block_overview(height)
            .await
            .with_context(|| format!("Failed to fetch block {}", height))?;

        let mut touched = BTreeSet::new();
        for txid in &block.txids {
            let tx = self
                .chain
                .raw_transaction(txid)
                .await
                .with_context(|| format!("Failed to fetch transaction {}", txid))?;
            for input in &tx.inputs {
                if let Some(address) = &input.address {
                    touched.insert(address.clone());
                }
            }
            for output in &tx.outputs {
                for address in output.script_pub_key.destinations() {
                    touched.insert(address.to_string());
                }
            }
        }

        for address in &touched {
            let balance_sat = self
                .chain
                .address_balance(address)
                .await
                .with_context(|| format!("Failed to fetch balance of {}", address))?;
            if balance_sat > 0 {
                self.balances.put_address_balance(&AddressBalanceRecord {
                    address: address.clone(),
                    balance_sat,
                })?;
            } else {
                self.balances.delete_address_balance(address)?;
            }
        }

        debug!(height, addresses = touched.len(), "Updated address balances");
        Ok(())
    }

    async fn after_pass(&self, _height: u64) -> Result<()> {
        self.refresh_summary()
    }
}
