//! Miner attribution aggregator
//!
//! Credits each block to its reward address: the staker (input 0 of the
//! coinstake) on proof-of-stake blocks, the first destination of coinbase
//! output 0 on proof-of-work blocks.

use crate::chain::ChainSource;
use crate::records::MinedBlocksRecord;
use crate::store::MinedBlocksRepository;
use crate::tracker::BlockProcessor;
use crate::types::{BlockOverview, Transaction};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Cursor name of the miner attribution aggregator.
pub const BLOCKS_MINED: &str = "blocks_mined";

/// Reward address of `block`, given its reward-bearing transaction.
pub fn reward_address(block: &BlockOverview, reward_tx: &Transaction) -> Option<String> {
    if block.flags.is_proof_of_stake() {
        reward_tx.inputs.first().and_then(|input| input.address.clone())
    } else {
        reward_tx
            .outputs
            .first()
            .and_then(|output| output.script_pub_key.destinations().first().map(|a| a.to_string()))
    }
}

pub struct MinerAttribution {
    chain: Arc<dyn ChainSource>,
    mined: Arc<dyn MinedBlocksRepository>,
}

impl MinerAttribution {
    pub fn new<S>(chain: Arc<dyn ChainSource>, store: Arc<S>) -> Self
    where
        S: MinedBlocksRepository + 'static,
    {
        Self {
            chain,
            mined: store,
        }
    }
}

#[async_trait]
impl BlockProcessor for MinerAttribution {
    fn name(&self) -> &'static str {
        BLOCKS_MINED
    }

    async fn process_block(&self, height: u64) -> Result<()> {
        let block = self
            .chain
            .block_overview(height)
            .await
            .with_context(|| format!("Failed to fetch block {}", height))?;

        let reward_index = if block.flags.is_proof_of_stake() { 1 } else { 0 };
        let Some(txid) = block.txids.get(reward_index) else {
            debug!(height, "Block has no reward transaction");
            return Ok(());
        };
        let reward_tx = self
            .chain
            .raw_transaction(txid)
            .await
            .with_context(|| format!("Failed to fetch transaction {}", txid))?;

        let Some(address) = reward_address(&block, &reward_tx) else {
            debug!(height, "No reward address");
            return Ok(());
        };

        let record = match self.mined.get_mined(&address)? {
            Some(existing) if existing.last_height >= height => return Ok(()),
            Some(existing) => MinedBlocksRecord {
                count: existing.count + 1,
                last_height: height,
                ..existing
            },
            None => MinedBlocksRecord {
                address: address.clone(),
                count: 1,
                last_height: height,
            },
        };
        self.mined.put_mined(&record)?;

        debug!(height, %address, count = record.count, "Attributed block");
        Ok(())
    }
}
