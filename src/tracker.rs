//! Block processor trait
//!
//! Each indexer is a processor plugged into a [`crate::scheduler::TipFollower`].
//! The follower calls it once per height, strictly ascending, and calls the
//! post-pass hook after a fully successful catch-up pass.

use anyhow::Result;
use async_trait::async_trait;

/// Per-block processing step of one indexer.
#[async_trait]
pub trait BlockProcessor: Send + Sync {
    /// Indexer name; also the cursor key.
    fn name(&self) -> &'static str;

    /// Process one block. An error aborts the pass and leaves the cursor
    /// at the previous height, so the block must be safe to replay.
    async fn process_block(&self, height: u64) -> Result<()>;

    /// Runs once after every block of a pass succeeded.
    async fn after_pass(&self, _height: u64) -> Result<()> {
        // Default no-op for processors without derived caches
        Ok(())
    }
}
