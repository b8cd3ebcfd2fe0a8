//! Sliding 24-hour cache of per-block figures
//!
//! The statistics aggregator inserts one entry per processed block. Entries
//! older than 24 hours relative to the newest cached block time are evicted,
//! so the rollup can be served without asking the chain again.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// Width of the sliding window in seconds.
pub const WINDOW_SECS: u64 = 24 * 60 * 60;

/// Figures of one block as folded into the daily statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockFigures {
    pub height: u64,
    pub time: u64,
    pub proof_of_stake: bool,
    pub tx_count: u64,
    pub fee_sat: i128,
    pub output_volume_sat: u128,
}

/// Totals over the cached window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DayRollup {
    pub blocks: u64,
    pub transactions: u64,
    pub fees_sat: i128,
    pub output_volume_sat: u128,
    /// Fee figures of stake blocks only
    pub stake_sat: i128,
    pub first_height: Option<u64>,
    pub last_height: Option<u64>,
}

/// Blocks of the last 24 hours, keyed by height.
#[derive(Default)]
pub struct RecentBlocks {
    blocks: Mutex<BTreeMap<u64, BlockFigures>>,
}

impl RecentBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a block and evict everything outside the window.
    pub fn insert(&self, figures: BlockFigures) {
        let mut blocks = self.blocks.lock().unwrap_or_else(PoisonError::into_inner);
        blocks.insert(figures.height, figures);

        let newest = blocks.values().map(|b| b.time).max().unwrap_or(0);
        let cutoff = newest.saturating_sub(WINDOW_SECS);
        blocks.retain(|_, b| b.time >= cutoff);
    }

    pub fn len(&self) -> usize {
        self.blocks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rollup(&self) -> DayRollup {
        let blocks = self.blocks.lock().unwrap_or_else(PoisonError::into_inner);
        let mut rollup = DayRollup {
            first_height: blocks.keys().next().copied(),
            last_height: blocks.keys().next_back().copied(),
            ..DayRollup::default()
        };
        for block in blocks.values() {
            rollup.blocks += 1;
            rollup.transactions += block.tx_count;
            rollup.fees_sat += block.fee_sat;
            rollup.output_volume_sat += block.output_volume_sat;
            if block.proof_of_stake {
                rollup.stake_sat += block.fee_sat;
            }
        }
        rollup
    }
}
