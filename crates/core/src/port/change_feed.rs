// Change Feed Port (live subscriptions)

use crate::domain::{Member, MemberId, Queue, QueueId};
use crate::error::Result;
use crate::port::{CancelHandle, StoreChange};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// What a subscription watches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchTarget {
    /// One queue document
    Queue(QueueId),
    /// All members of a queue, ascending by token
    Members(QueueId),
    /// One member document
    Member {
        queue_id: QueueId,
        member_id: MemberId,
    },
    /// Active queues, newest first
    ActiveQueues,
}

impl WatchTarget {
    /// Whether `change` can alter what this target reads
    pub fn is_affected_by(&self, change: &StoreChange) -> bool {
        match (self, change) {
            (WatchTarget::Queue(id), StoreChange::Queue { queue_id }) => id == queue_id,
            (WatchTarget::Members(id), StoreChange::Member { queue_id, .. }) => id == queue_id,
            (
                WatchTarget::Member {
                    queue_id: id,
                    member_id,
                },
                StoreChange::Member {
                    queue_id,
                    member_id: changed,
                },
            ) => id == queue_id && member_id == changed,
            (WatchTarget::ActiveQueues, StoreChange::Queue { .. }) => true,
            _ => false,
        }
    }
}

/// Full current value of a watched target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snapshot {
    Queue(Option<Queue>),
    Members(Vec<Member>),
    Member(Option<Member>),
    Queues(Vec<Queue>),
}

/// Initial snapshot followed by one snapshot per relevant change
pub struct SnapshotStream {
    receiver: mpsc::UnboundedReceiver<Result<Snapshot>>,
    cancel: CancelHandle,
}

impl SnapshotStream {
    pub fn new(receiver: mpsc::UnboundedReceiver<Result<Snapshot>>, cancel: CancelHandle) -> Self {
        Self { receiver, cancel }
    }

    /// Next delivery; None once the feed has stopped
    pub async fn next(&mut self) -> Option<Result<Snapshot>> {
        self.receiver.recv().await
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn into_parts(self) -> (mpsc::UnboundedReceiver<Result<Snapshot>>, CancelHandle) {
        (self.receiver, self.cancel)
    }
}

/// Vendor-neutral live subscription interface
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Subscribe to `target`; the first delivery is the current value
    async fn subscribe(&self, target: WatchTarget) -> Result<SnapshotStream>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::port::{cancel_channel, CancelToken};
    use std::sync::Mutex;

    struct Subscriber {
        target: WatchTarget,
        tx: mpsc::UnboundedSender<Result<Snapshot>>,
        token: CancelToken,
    }

    /// Feed whose deliveries are pushed by the test
    #[derive(Default)]
    pub struct ScriptedChangeFeed {
        subscribers: Mutex<Vec<Subscriber>>,
    }

    impl ScriptedChangeFeed {
        pub fn new() -> Self {
            Self::default()
        }

        /// Deliver `item` to every live subscription; returns how many got it
        pub fn emit(&self, item: impl Fn() -> Result<Snapshot>) -> usize {
            let mut subscribers = self.subscribers.lock().unwrap();
            subscribers.retain(|s| !s.token.is_cancelled() && !s.tx.is_closed());
            subscribers
                .iter()
                .filter(|s| s.tx.send(item()).is_ok())
                .count()
        }

        /// Subscriptions that have not been cancelled
        pub fn active_subscriptions(&self) -> usize {
            self.subscribers
                .lock()
                .unwrap()
                .iter()
                .filter(|s| !s.token.is_cancelled())
                .count()
        }

        pub fn targets(&self) -> Vec<WatchTarget> {
            self.subscribers
                .lock()
                .unwrap()
                .iter()
                .map(|s| s.target.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ChangeFeed for ScriptedChangeFeed {
        async fn subscribe(&self, target: WatchTarget) -> Result<SnapshotStream> {
            let (tx, rx) = mpsc::unbounded_channel();
            let (handle, token) = cancel_channel();
            self.subscribers
                .lock()
                .unwrap()
                .push(Subscriber { target, tx, token });
            Ok(SnapshotStream::new(rx, handle))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_relevance() {
        let q1 = || "q1".to_string();
        let queue_change = StoreChange::Queue { queue_id: q1() };
        let member_change = StoreChange::Member {
            queue_id: q1(),
            member_id: "m1".to_string(),
        };
        let sibling_change = StoreChange::Member {
            queue_id: q1(),
            member_id: "m2".to_string(),
        };
        let other = StoreChange::Member {
            queue_id: "q2".to_string(),
            member_id: "m1".to_string(),
        };

        assert!(WatchTarget::Queue(q1()).is_affected_by(&queue_change));
        assert!(!WatchTarget::Queue(q1()).is_affected_by(&member_change));
        assert!(WatchTarget::Members(q1()).is_affected_by(&member_change));
        assert!(!WatchTarget::Members(q1()).is_affected_by(&other));
        assert!(WatchTarget::Member {
            queue_id: q1(),
            member_id: "m1".to_string()
        }
        .is_affected_by(&member_change));
        assert!(!WatchTarget::Member {
            queue_id: q1(),
            member_id: "m1".to_string()
        }
        .is_affected_by(&sibling_change));
        assert!(!WatchTarget::Member {
            queue_id: "q2".to_string(),
            member_id: "m2".to_string()
        }
        .is_affected_by(&sibling_change));
        assert!(WatchTarget::Members(q1()).is_affected_by(&sibling_change));
        assert!(WatchTarget::ActiveQueues.is_affected_by(&queue_change));
        assert!(!WatchTarget::ActiveQueues.is_affected_by(&member_change));
    }
}
