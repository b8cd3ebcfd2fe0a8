//! Coin issuance schedule
//!
//! Blocks up to the last proof-of-work height pay a flat premine subsidy.
//! After that each block pays a stake subsidy that halves every
//! `HALVING_INTERVAL` blocks and stops after `MAX_HALVINGS`.

use crate::types::COIN;

/// Last height mined by proof-of-work.
pub const LAST_POW_BLOCK: u64 = 5_000;

pub const HALVING_INTERVAL: u64 = 985_500;

pub const MAX_HALVINGS: u32 = 7;

/// Subsidy of each proof-of-work block.
pub const POW_SUBSIDY: u64 = 20_000 * COIN;

/// Subsidy of each stake block before the first halving.
pub const POS_SUBSIDY: u64 = 4 * COIN;

/// Coins excluded from the circulating supply.
pub const NON_CIRCULATING: u64 = 12_000_000 * COIN;

/// Block subsidy in satoshis at `height`.
pub fn block_subsidy(height: u64) -> u64 {
    if height == 0 {
        return 0;
    }
    if height <= LAST_POW_BLOCK {
        return POW_SUBSIDY;
    }
    let halvings = (height - LAST_POW_BLOCK - 1) / HALVING_INTERVAL;
    if halvings >= u64::from(MAX_HALVINGS) {
        return 0;
    }
    POS_SUBSIDY >> halvings
}

/// Coins issued by stake blocks up to and including `height`, in satoshis.
pub fn pos_supply(height: u64) -> u64 {
    if height <= LAST_POW_BLOCK {
        return 0;
    }
    let mut remaining = height - LAST_POW_BLOCK;
    let mut total = 0u64;
    let mut halvings = 0u32;
    while remaining > 0 && halvings < MAX_HALVINGS {
        let span = remaining.min(HALVING_INTERVAL);
        total += span * (POS_SUBSIDY >> halvings);
        remaining -= span;
        halvings += 1;
    }
    total
}

/// Total coins issued up to and including `height`, in satoshis.
pub fn total_supply(height: u64) -> u64 {
    height.min(LAST_POW_BLOCK) * POW_SUBSIDY + pos_supply(height)
}

/// Total supply minus the non-circulating allocation, in satoshis.
pub fn circulating_supply(height: u64) -> u64 {
    total_supply(height).saturating_sub(NON_CIRCULATING)
}
