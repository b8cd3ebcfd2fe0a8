//! Tip-follow scheduler
//!
//! [`TipFollower`] drives one [`BlockProcessor`] from its persisted cursor up
//! to the newest observed tip. Tip signals that arrive while a pass is running
//! only raise the observed tip; the running pass then starts one more pass
//! covering everything it missed. [`TipPoller`] turns periodic tip polls into
//! the signal stream shared by all followers.

use crate::chain::ChainSource;
use crate::publish::{IndexerEvent, Publisher};
use crate::store::CursorRepository;
use crate::tracker::BlockProcessor;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// What a call to [`TipFollower::on_tip_signal`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TipOutcome {
    /// A pass was already running; it will pick the new tip up.
    Coalesced,
    /// Ran `passes` passes and stopped with the cursor at `height`.
    CaughtUp { passes: u32, height: u64 },
    /// A pass failed; the cursor stays at `height` until the next signal.
    Failed { passes: u32, height: u64 },
}

/// Per-indexer catch-up engine.
pub struct TipFollower<P> {
    processor: P,
    cursors: Arc<dyn CursorRepository>,
    publisher: Arc<dyn Publisher>,
    cursor: AtomicU64,
    observed_tip: AtomicU64,
    running: AtomicBool,
}

impl<P: BlockProcessor> TipFollower<P> {
    /// Create a follower, reading (or creating) its durable cursor.
    ///
    /// A fresh cursor starts at `start_height`; an existing one is only raised.
    pub fn new(
        processor: P,
        cursors: Arc<dyn CursorRepository>,
        publisher: Arc<dyn Publisher>,
        start_height: u64,
    ) -> Result<Self> {
        let cursor = cursors
            .ensure_cursor(processor.name(), start_height)
            .with_context(|| format!("Failed to load cursor for {}", processor.name()))?;
        info!(indexer = processor.name(), cursor, "Loaded cursor");

        Ok(Self {
            processor,
            cursors,
            publisher,
            cursor: AtomicU64::new(cursor),
            observed_tip: AtomicU64::new(cursor),
            running: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &'static str {
        self.processor.name()
    }

    /// Last height processed successfully.
    pub fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::SeqCst)
    }

    pub fn observed_tip(&self) -> u64 {
        self.observed_tip.load(Ordering::SeqCst)
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    /// Handle a new tip height.
    ///
    /// Returns immediately if a pass is already running. Otherwise runs
    /// catch-up passes until the cursor reaches the observed tip or a pass
    /// fails.
    pub async fn on_tip_signal(&self, height: u64) -> TipOutcome {
        self.observed_tip.fetch_max(height, Ordering::SeqCst);

        if !self.try_acquire() {
            debug!(indexer = self.name(), height, "Pass in progress, tip coalesced");
            return TipOutcome::Coalesced;
        }

        let mut passes = 0u32;
        loop {
            let target = self.observed_tip.load(Ordering::SeqCst);
            passes += 1;

            let result = self.catch_up(target).await;
            self.running.store(false, Ordering::SeqCst);

            if let Err(e) = result {
                error!(
                    indexer = self.name(),
                    cursor = self.cursor(),
                    "Catch-up pass failed: {:#}",
                    e
                );
                return TipOutcome::Failed {
                    passes,
                    height: self.cursor(),
                };
            }

            // Signals that arrived mid-pass only raised the observed tip
            if self.observed_tip.load(Ordering::SeqCst) <= self.cursor() {
                break;
            }
            // A signal that slipped in after the release now owns the next pass
            if !self.try_acquire() {
                break;
            }
        }

        TipOutcome::CaughtUp {
            passes,
            height: self.cursor(),
        }
    }

    fn try_acquire(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Process every height from `cursor + 1` to `target`, in order.
    async fn catch_up(&self, target: u64) -> Result<()> {
        let name = self.name();
        let start = self.cursor() + 1;
        if start > target {
            return Ok(());
        }

        info!(indexer = name, "Start update from {} to {}", start, target);

        for height in start..=target {
            self.processor
                .process_block(height)
                .await
                .with_context(|| format!("Failed to process block {}", height))?;

            self.cursors
                .set_cursor(name, height)
                .with_context(|| format!("Failed to persist cursor at {}", height))?;
            self.cursor.store(height, Ordering::SeqCst);

            self.publisher.publish(IndexerEvent::BlockCommitted {
                indexer: name,
                height,
            });
            debug!(indexer = name, height, "Committed block");
        }

        self.processor
            .after_pass(target)
            .await
            .with_context(|| format!("Post-pass hook failed at {}", target))?;
        self.publisher.publish(IndexerEvent::PassCompleted {
            indexer: name,
            height: target,
        });

        info!(indexer = name, "Updated to {}", target);
        Ok(())
    }
}

impl<P: BlockProcessor + 'static> TipFollower<P> {
    /// Consume tip signals until the channel closes.
    ///
    /// Each signal is handled on its own task so a long pass never delays
    /// receipt of the next signal.
    pub async fn run(self: Arc<Self>, mut tips: broadcast::Receiver<u64>) {
        info!(indexer = self.name(), "Following tip");
        loop {
            match tips.recv().await {
                Ok(height) => {
                    let follower = Arc::clone(&self);
                    tokio::spawn(async move {
                        follower.on_tip_signal(height).await;
                    });
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Later signals carry newer tips
                    warn!(indexer = self.name(), skipped, "Tip signals lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        info!(indexer = self.name(), "Tip stream closed");
    }
}

/// Polls the chain tip and broadcasts every change.
pub struct TipPoller {
    chain: Arc<dyn ChainSource>,
    interval: Duration,
    sender: broadcast::Sender<u64>,
}

impl TipPoller {
    pub fn new(chain: Arc<dyn ChainSource>, interval: Duration, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            chain,
            interval,
            sender,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<u64> {
        self.sender.subscribe()
    }

    /// Poll forever. The first successful poll is always broadcast.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        let mut last: Option<u64> = None;
        loop {
            ticker.tick().await;
            match self.chain.tip_height().await {
                Ok(height) if last != Some(height) => {
                    last = Some(height);
                    debug!(height, "New tip");
                    let _ = self.sender.send(height);
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to poll tip height: {:#}", e),
            }
        }
    }
}
