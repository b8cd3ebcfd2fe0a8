//! Indexer progress notifications
//!
//! The scheduler calls a [`Publisher`] after each committed block and after
//! each completed catch-up pass. Subscribers (live views, websocket bridges)
//! hang off [`BroadcastPublisher`].

use tokio::sync::broadcast;

/// Progress event emitted by a tip follower.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexerEvent {
    /// `height` was processed and the cursor now points at it.
    BlockCommitted { indexer: &'static str, height: u64 },
    /// A catch-up pass ending at `height` finished, post-pass hook included.
    PassCompleted { indexer: &'static str, height: u64 },
}

impl IndexerEvent {
    pub fn indexer(&self) -> &'static str {
        match self {
            IndexerEvent::BlockCommitted { indexer, .. } => indexer,
            IndexerEvent::PassCompleted { indexer, .. } => indexer,
        }
    }
}

/// Sink for indexer events. Publishing never blocks and never fails the pass.
pub trait Publisher: Send + Sync {
    fn publish(&self, event: IndexerEvent);
}

/// Discards every event.
pub struct NoopPublisher;

impl Publisher for NoopPublisher {
    fn publish(&self, _event: IndexerEvent) {}
}

/// Fans events out over a tokio broadcast channel.
pub struct BroadcastPublisher {
    sender: broadcast::Sender<IndexerEvent>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IndexerEvent> {
        self.sender.subscribe()
    }
}

impl Publisher for BroadcastPublisher {
    fn publish(&self, event: IndexerEvent) {
        // No subscribers is not an error
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_publisher_fans_out() {
        let publisher = BroadcastPublisher::new(8);
        let mut first = publisher.subscribe();
        let mut second = publisher.subscribe();

        publisher.publish(IndexerEvent::BlockCommitted {
            indexer: "tokens",
            height: 7,
        });

        let event = first.recv().await.unwrap();
        assert_eq!(event.indexer(), "tokens");
        assert_eq!(second.recv().await.unwrap(), event);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let publisher = BroadcastPublisher::new(1);
        publisher.publish(IndexerEvent::PassCompleted {
            indexer: "stats",
            height: 1,
        });
        NoopPublisher.publish(IndexerEvent::PassCompleted {
            indexer: "stats",
            height: 1,
        });
    }
}
