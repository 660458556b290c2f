// Subscription adapters
//
// Wrap a ChangeFeed subscription and hand typed values to a callback.
// Delivery errors are logged and swallowed: the callback only ever sees
// successful snapshots.

mod feed;

pub use feed::{load_snapshot, StoreChangeFeed};

use crate::domain::{Member, MemberId, Queue, QueueId};
use crate::error::Result;
use crate::port::{CancelHandle, ChangeFeed, Snapshot, WatchTarget};
use tracing::{error, warn};

/// Handle to a running subscription
///
/// `cancel()` stops further callbacks and releases the feed; calling it again
/// does nothing. Dropping the handle cancels as well.
#[must_use = "dropping a WatchHandle ends the subscription"]
pub struct WatchHandle {
    cancel: CancelHandle,
}

impl WatchHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Queue document (None once it is gone)
pub async fn watch_queue<F>(
    feed: &dyn ChangeFeed,
    queue_id: &QueueId,
    callback: F,
) -> Result<WatchHandle>
where
    F: FnMut(Option<Queue>) + Send + 'static,
{
    forward(
        feed,
        WatchTarget::Queue(queue_id.clone()),
        |snapshot| match snapshot {
            Snapshot::Queue(queue) => Some(queue),
            _ => None,
        },
        callback,
    )
    .await
}

/// Members of a queue, ascending by token
pub async fn watch_members<F>(
    feed: &dyn ChangeFeed,
    queue_id: &QueueId,
    callback: F,
) -> Result<WatchHandle>
where
    F: FnMut(Vec<Member>) + Send + 'static,
{
    forward(
        feed,
        WatchTarget::Members(queue_id.clone()),
        |snapshot| match snapshot {
            Snapshot::Members(members) => Some(members),
            _ => None,
        },
        callback,
    )
    .await
}

/// One member (None if it does not exist)
pub async fn watch_member<F>(
    feed: &dyn ChangeFeed,
    queue_id: &QueueId,
    member_id: &MemberId,
    callback: F,
) -> Result<WatchHandle>
where
    F: FnMut(Option<Member>) + Send + 'static,
{
    forward(
        feed,
        WatchTarget::Member {
            queue_id: queue_id.clone(),
            member_id: member_id.clone(),
        },
        |snapshot| match snapshot {
            Snapshot::Member(member) => Some(member),
            _ => None,
        },
        callback,
    )
    .await
}

/// Active queues, newest first
pub async fn watch_active_queues<F>(feed: &dyn ChangeFeed, callback: F) -> Result<WatchHandle>
where
    F: FnMut(Vec<Queue>) + Send + 'static,
{
    forward(
        feed,
        WatchTarget::ActiveQueues,
        |snapshot| match snapshot {
            Snapshot::Queues(queues) => Some(queues),
            _ => None,
        },
        callback,
    )
    .await
}

async fn forward<T, E, F>(
    feed: &dyn ChangeFeed,
    target: WatchTarget,
    extract: E,
    mut callback: F,
) -> Result<WatchHandle>
where
    T: Send + 'static,
    E: Fn(Snapshot) -> Option<T> + Send + 'static,
    F: FnMut(T) + Send + 'static,
{
    let stream = feed.subscribe(target.clone()).await?;
    let (mut receiver, cancel) = stream.into_parts();
    let mut token = cancel.token();

    tokio::spawn(async move {
        loop {
            let delivery = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                delivery = receiver.recv() => delivery,
            };

            match delivery {
                None => break,
                Some(Ok(snapshot)) => {
                    if token.is_cancelled() {
                        break;
                    }
                    match extract(snapshot) {
                        Some(value) => callback(value),
                        None => warn!(watch = ?target, "Snapshot of unexpected kind dropped"),
                    }
                }
                Some(Err(e)) => {
                    error!(watch = ?target, error = %e, "Error listening to store");
                }
            }
        }
    });

    Ok(WatchHandle { cancel })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::QueueService;
    use crate::application::queue_service::JoinRequest;
    use crate::error::AppError;
    use crate::port::change_feed::mocks::ScriptedChangeFeed;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::time_provider::mocks::ManualClock;
    use crate::port::InMemoryQueueStore;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::mpsc;

    async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("callback in time")
            .expect("channel open")
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_errors_do_not_reach_callback() {
        let feed = ScriptedChangeFeed::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = calls.clone();

        let handle = watch_active_queues(&feed, move |queues| {
            seen.lock().unwrap().push(queues.len());
        })
        .await
        .unwrap();

        feed.emit(|| Err(AppError::Database("permission denied".to_string())));
        feed.emit(|| Ok(Snapshot::Queues(Vec::new())));
        settle().await;

        assert_eq!(*calls.lock().unwrap(), vec![0]);
        handle.cancel();
    }

    #[tokio::test]
    async fn test_cancel_stops_callbacks_and_is_idempotent() {
        let feed = ScriptedChangeFeed::new();
        let count = Arc::new(Mutex::new(0));
        let counter = count.clone();

        let handle = watch_queue(&feed, &"q1".to_string(), move |_| {
            *counter.lock().unwrap() += 1;
        })
        .await
        .unwrap();
        assert_eq!(feed.targets(), vec![WatchTarget::Queue("q1".to_string())]);

        feed.emit(|| Ok(Snapshot::Queue(None)));
        settle().await;
        assert_eq!(*count.lock().unwrap(), 1);

        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
        assert_eq!(feed.active_subscriptions(), 0);

        assert_eq!(feed.emit(|| Ok(Snapshot::Queue(None))), 0);
        settle().await;
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_member_list_follows_store() {
        let clock = Arc::new(ManualClock::new(0));
        let store = Arc::new(InMemoryQueueStore::new(
            clock,
            Arc::new(SequentialIdProvider::new("member")),
        ));
        let service = QueueService::new(store.clone(), Arc::new(SequentialIdProvider::new("queue")));
        let feed = StoreChangeFeed::new(store.clone());
        let queue_id = service.create_queue("Deli").await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = watch_members(&feed, &queue_id, move |members| {
            let tokens: Vec<i64> = members.iter().map(|m| m.token_number).collect();
            let _ = tx.send(tokens);
        })
        .await
        .unwrap();

        assert_eq!(recv(&mut rx).await, Vec::<i64>::new());

        let mut expected = Vec::new();
        for name in ["Ada", "Bob"] {
            let ticket = service
                .join_queue(JoinRequest {
                    queue_id: queue_id.clone(),
                    name: name.to_string(),
                    quantity: 2,
                })
                .await
                .unwrap();
            expected.push(ticket.token_number);
            assert_eq!(recv(&mut rx).await, expected);
        }
        assert_eq!(expected, vec![1, 2]);

        handle.cancel();
    }

    #[tokio::test]
    async fn test_single_member_sees_transition() {
        let store = Arc::new(InMemoryQueueStore::new(
            Arc::new(ManualClock::new(0)),
            Arc::new(SequentialIdProvider::new("member")),
        ));
        let service = QueueService::new(store.clone(), Arc::new(SequentialIdProvider::new("queue")));
        let feed = StoreChangeFeed::new(store.clone());
        let queue_id = service.create_queue("Deli").await.unwrap();
        let ticket = service
            .join_queue(JoinRequest {
                queue_id: queue_id.clone(),
                name: "Ada".to_string(),
                quantity: 1,
            })
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = watch_member(&feed, &queue_id, &ticket.member_id, move |member| {
            let _ = tx.send(member.map(|m| m.status));
        })
        .await
        .unwrap();
        assert_eq!(
            recv(&mut rx).await,
            Some(crate::domain::MemberStatus::Waiting)
        );

        service
            .mark_as_served(&queue_id, &ticket.member_id)
            .await
            .unwrap();
        assert_eq!(recv(&mut rx).await, Some(crate::domain::MemberStatus::Served));

        handle.cancel();
    }

    #[tokio::test]
    async fn test_single_member_ignores_siblings() {
        let store = Arc::new(InMemoryQueueStore::new(
            Arc::new(ManualClock::new(0)),
            Arc::new(SequentialIdProvider::new("member")),
        ));
        let service = QueueService::new(store.clone(), Arc::new(SequentialIdProvider::new("queue")));
        let feed = StoreChangeFeed::new(store.clone());
        let queue_id = service.create_queue("Deli").await.unwrap();
        let join = |name: &str| JoinRequest {
            queue_id: queue_id.clone(),
            name: name.to_string(),
            quantity: 1,
        };
        let ada = service.join_queue(join("Ada")).await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = watch_member(&feed, &queue_id, &ada.member_id, move |member| {
            let _ = tx.send(member.map(|m| m.status));
        })
        .await
        .unwrap();
        assert_eq!(
            recv(&mut rx).await,
            Some(crate::domain::MemberStatus::Waiting)
        );

        let bob = service.join_queue(join("Bob")).await.unwrap();
        service
            .mark_as_served(&queue_id, &bob.member_id)
            .await
            .unwrap();
        settle().await;
        assert!(rx.try_recv().is_err());

        service.skip_token(&queue_id, &ada.member_id).await.unwrap();
        assert_eq!(
            recv(&mut rx).await,
            Some(crate::domain::MemberStatus::Skipped)
        );

        handle.cancel();
    }
}
