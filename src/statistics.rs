//! Daily statistics aggregator
//!
//! Folds every block into the statistic bucket of its UTC calendar date and
//! keeps the cumulative stake reward counter. Each bucket remembers the
//! highest height folded into it, so replaying a block never double counts.

use crate::cache::{BlockFigures, RecentBlocks};
use crate::chain::ChainSource;
use crate::fee;
use crate::records::{DailyStatistic, TotalStatistic};
use crate::store::{DailyStatisticRepository, TotalStatisticRepository};
use crate::supply;
use crate::tracker::BlockProcessor;
use crate::types::{sat_to_coin_text, BlockOverview};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bigdecimal::{BigDecimal, FromPrimitive};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cursor name of the statistics aggregator.
pub const STATISTICS: &str = "statistics";

/// Cumulative stake reward, satoshis.
pub const POS_TOTAL_AMOUNT: &str = "pos_total_amount";

/// `YYYY-MM-DD` of a unix timestamp, in UTC.
pub fn day_of(time: u64) -> Result<String> {
    let secs = i64::try_from(time).context("Block time out of range")?;
    let date = chrono::DateTime::from_timestamp(secs, 0)
        .with_context(|| format!("Invalid block time {}", time))?;
    Ok(date.format("%Y-%m-%d").to_string())
}

fn add_decimal(sum: &str, delta: &BigDecimal) -> Result<String> {
    let current = BigDecimal::from_str(sum)
        .with_context(|| format!("Stored sum {:?} is not a decimal", sum))?;
    Ok((current + delta).to_string())
}

pub struct StatisticsAggregator {
    chain: Arc<dyn ChainSource>,
    days: Arc<dyn DailyStatisticRepository>,
    totals: Arc<dyn TotalStatisticRepository>,
    recent: Arc<RecentBlocks>,
}

impl StatisticsAggregator {
    pub fn new<S>(chain: Arc<dyn ChainSource>, store: Arc<S>) -> Self
    where
        S: DailyStatisticRepository + TotalStatisticRepository + 'static,
    {
        Self {
            chain,
            days: store.clone(),
            totals: store,
            recent: Arc::new(RecentBlocks::new()),
        }
    }

    /// Shared handle to the 24h cache.
    pub fn recent(&self) -> Arc<RecentBlocks> {
        self.recent.clone()
    }

    fn fold_day(&self, block: &BlockOverview, figures: &BlockFigures) -> Result<()> {
        let date = day_of(block.time)?;
        let mut day = self
            .days
            .get_day(&date)?
            .unwrap_or_else(|| DailyStatistic::empty(date.clone()));

        if day.blocks_count > 0 && block.height <= day.last_height {
            debug!(height = block.height, %date, "Block already folded into day");
            return Ok(());
        }

        let fee = BigDecimal::from_i128(figures.fee_sat).context("Fee out of range")?;
        let volume =
            BigDecimal::from_u128(figures.output_volume_sat).context("Volume out of range")?;

        day.fees_sum = add_decimal(&day.fees_sum, &fee)?;
        day.fees_count += 1;
        day.tx_count += figures.tx_count;
        day.blocks_count += 1;
        day.output_volume_sum = add_decimal(&day.output_volume_sum, &volume)?;

        if figures.proof_of_stake {
            match BigDecimal::from_str(&block.difficulty) {
                Ok(difficulty) => {
                    day.difficulty_sum = add_decimal(&day.difficulty_sum, &difficulty)?;
                    day.difficulty_count += 1;
                }
                Err(_) => warn!(
                    height = block.height,
                    difficulty = %block.difficulty,
                    "Undecodable difficulty"
                ),
            }
            day.stake_sum = add_decimal(&day.stake_sum, &fee)?;
        }

        day.supply = sat_to_coin_text(supply::total_supply(block.height));
        day.last_height = block.height;
        self.days.put_day(&day)
    }

    fn add_stake_total(&self, height: u64, fee_sat: i128) -> Result<()> {
        let mut total = match self.totals.get_total(POS_TOTAL_AMOUNT)? {
            Some(total) if total.last_height >= height => return Ok(()),
            Some(total) => total,
            None => TotalStatistic {
                name: POS_TOTAL_AMOUNT.to_string(),
                value: "0".to_string(),
                last_height: 0,
            },
        };
        let fee = BigDecimal::from_i128(fee_sat).context("Fee out of range")?;
        total.value = add_decimal(&total.value, &fee)?;
        total.last_height = height;
        self.totals.put_total(&total)
    }
}

#[async_trait]
impl BlockProcessor for StatisticsAggregator {
    fn name(&self) -> &'static str {
        STATISTICS
    }

    async fn process_block(&self, height: u64) -> Result<()> {
        let block = self
            .chain
            .block_overview(height)
            .await
            .with_context(|| format!("Failed to fetch block {}", height))?;
        let subsidy = self
            .chain
            .block_subsidy(height)
            .await
            .with_context(|| format!("Failed to fetch subsidy at {}", height))?;

        let mut txs = Vec::with_capacity(block.txids.len());
        for txid in &block.txids {
            let tx = self
                .chain
                .raw_transaction(txid)
                .await
                .with_context(|| format!("Failed to fetch transaction {}", txid))?;
            txs.push(tx);
        }

        let figures = BlockFigures {
            height,
            time: block.time,
            proof_of_stake: block.flags.is_proof_of_stake(),
            tx_count: txs.len() as u64,
            fee_sat: fee::block_fee(&block, &txs, subsidy),
            output_volume_sat: fee::output_volume(&block, &txs),
        };

        self.fold_day(&block, &figures)?;
        if figures.proof_of_stake {
            self.add_stake_total(height, figures.fee_sat)?;
        }

        debug!(height, fee = %figures.fee_sat, volume = %figures.output_volume_sat, "Folded block");
        self.recent.insert(figures);
        Ok(())
    }

    async fn after_pass(&self, height: u64) -> Result<()> {
        let rollup = self.recent.rollup();
        info!(
            height,
            blocks = rollup.blocks,
            transactions = rollup.transactions,
            fees_sat = %rollup.fees_sat,
            "Last 24h"
        );
        Ok(())
    }
}
