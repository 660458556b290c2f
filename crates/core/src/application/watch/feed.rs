// Change feed backed by a QueueStore's change broadcast

use crate::error::Result;
use crate::port::{
    cancel_channel, ChangeFeed, QueueStore, Snapshot, SnapshotStream, WatchTarget,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Re-reads the watched target after every relevant committed change
pub struct StoreChangeFeed {
    store: Arc<dyn QueueStore>,
}

impl StoreChangeFeed {
    pub fn new(store: Arc<dyn QueueStore>) -> Self {
        Self { store }
    }
}

/// Read the full current value of `target`
pub async fn load_snapshot(store: &dyn QueueStore, target: &WatchTarget) -> Result<Snapshot> {
    match target {
        WatchTarget::Queue(queue_id) => Ok(Snapshot::Queue(store.find_queue(queue_id).await?)),
        WatchTarget::Members(queue_id) => {
            Ok(Snapshot::Members(store.list_members(queue_id).await?))
        }
        WatchTarget::Member {
            queue_id,
            member_id,
        } => Ok(Snapshot::Member(
            store.find_member(queue_id, member_id).await?,
        )),
        WatchTarget::ActiveQueues => Ok(Snapshot::Queues(store.list_active_queues().await?)),
    }
}

#[async_trait]
impl ChangeFeed for StoreChangeFeed {
    async fn subscribe(&self, target: WatchTarget) -> Result<SnapshotStream> {
        // Listen before the first read so no commit slips between the two
        let mut changes = self.store.changes();
        let store = Arc::clone(&self.store);
        let (tx, rx) = mpsc::unbounded_channel();
        let (handle, mut token) = cancel_channel();

        tokio::spawn(async move {
            debug!(watch = ?target, "Change feed started");

            if tx.send(load_snapshot(store.as_ref(), &target).await).is_err() {
                return;
            }

            loop {
                let change = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    change = changes.recv() => change,
                };

                match change {
                    Ok(change) if !target.is_affected_by(&change) => continue,
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => {
                        // Missed changes are covered by re-reading everything
                        warn!(watch = ?target, missed, "Change feed lagged");
                    }
                    Err(RecvError::Closed) => break,
                }

                if token.is_cancelled() {
                    break;
                }
                if tx.send(load_snapshot(store.as_ref(), &target).await).is_err() {
                    break;
                }
            }

            debug!(watch = ?target, "Change feed stopped");
        });

        Ok(SnapshotStream::new(rx, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::time_provider::mocks::ManualClock;
    use crate::port::InMemoryQueueStore;
    use std::time::Duration;

    fn store() -> Arc<InMemoryQueueStore> {
        Arc::new(InMemoryQueueStore::new(
            Arc::new(ManualClock::new(0)),
            Arc::new(SequentialIdProvider::new("m")),
        ))
    }

    async fn next(stream: &mut SnapshotStream) -> Snapshot {
        tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("snapshot in time")
            .expect("feed still running")
            .expect("snapshot loaded")
    }

    #[tokio::test]
    async fn test_initial_snapshot_then_change() {
        let store = store();
        let feed = StoreChangeFeed::new(store.clone());
        let queue_id = "q1".to_string();

        let mut stream = feed
            .subscribe(WatchTarget::Queue(queue_id.clone()))
            .await
            .unwrap();
        assert_eq!(next(&mut stream).await, Snapshot::Queue(None));

        store.create_queue(&queue_id, "Deli").await.unwrap();
        match next(&mut stream).await {
            Snapshot::Queue(Some(queue)) => assert_eq!(queue.name, "Deli"),
            other => panic!("unexpected snapshot: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unrelated_changes_are_ignored() {
        let store = store();
        let feed = StoreChangeFeed::new(store.clone());

        let mut stream = feed
            .subscribe(WatchTarget::Queue("q1".to_string()))
            .await
            .unwrap();
        next(&mut stream).await;

        store.create_queue(&"q2".to_string(), "Other").await.unwrap();
        let pending = tokio::time::timeout(Duration::from_millis(100), stream.next()).await;
        assert!(pending.is_err(), "no delivery expected for another queue");
    }

    #[tokio::test]
    async fn test_cancel_stops_feed() {
        let store = store();
        let feed = StoreChangeFeed::new(store.clone());

        let mut stream = feed.subscribe(WatchTarget::ActiveQueues).await.unwrap();
        next(&mut stream).await;

        stream.cancel_handle().cancel();
        let end = tokio::time::timeout(Duration::from_secs(2), async {
            // Drain until the task drops its sender
            while stream.next().await.is_some() {}
        })
        .await;
        assert!(end.is_ok(), "feed task should exit after cancel");
    }
}
