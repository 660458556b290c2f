//! Subscription adapters driven by the SQLite store's change broadcast

use queueline_core::application::queue_service::JoinRequest;
use queueline_core::application::{watch_active_queues, watch_members, watch_queue};
use queueline_integration_tests::Harness;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("update in time")
        .expect("watch still running")
}

async fn join(h: &Harness, queue_id: &str, name: &str) -> String {
    h.service
        .join_queue(JoinRequest {
            queue_id: queue_id.to_string(),
            name: name.to_string(),
            quantity: 1,
        })
        .await
        .unwrap()
        .member_id
}

#[tokio::test]
async fn test_members_watch_follows_joins_and_stops_on_cancel() {
    let h = Harness::in_memory().await;
    let feed = h.feed();
    let queue_id = h.service.create_queue("Deli").await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = watch_members(feed.as_ref(), &queue_id, move |members| {
        let _ = tx.send(members);
    })
    .await
    .unwrap();

    assert!(recv(&mut rx).await.is_empty());

    join(&h, &queue_id, "Ada").await;
    let members = recv(&mut rx).await;
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].name, "Ada");

    join(&h, &queue_id, "Bob").await;
    let members = recv(&mut rx).await;
    let tokens: Vec<i64> = members.iter().map(|m| m.token_number).collect();
    assert_eq!(tokens, vec![1, 2]);

    handle.cancel();
    handle.cancel();
    join(&h, &queue_id, "Cy").await;

    let late = timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(!matches!(late, Ok(Some(_))), "no callbacks after cancel");
}

#[tokio::test]
async fn test_queue_watch_sees_serve_statistics() {
    let h = Harness::in_memory().await;
    let feed = h.feed();
    let queue_id = h.service.create_queue("Deli").await.unwrap();
    let member_id = join(&h, &queue_id, "Ada").await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _handle = watch_queue(feed.as_ref(), &queue_id, move |queue| {
        let _ = tx.send(queue);
    })
    .await
    .unwrap();

    let initial = recv(&mut rx).await.unwrap();
    assert_eq!(initial.total_served, 0);

    h.clock.advance_secs(30);
    h.service.mark_as_served(&queue_id, &member_id).await.unwrap();

    let updated = recv(&mut rx).await.unwrap();
    assert_eq!(updated.total_served, 1);
    assert_eq!(updated.current_token, 1);
    assert_eq!(updated.average_serve_time, 30);
}

#[tokio::test]
async fn test_missing_queue_watch_reports_none() {
    let h = Harness::in_memory().await;
    let feed = h.feed();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _handle = watch_queue(feed.as_ref(), &"ghost".to_string(), move |queue| {
        let _ = tx.send(queue);
    })
    .await
    .unwrap();

    assert!(recv(&mut rx).await.is_none());
}

#[tokio::test]
async fn test_active_queues_watch_drops_closed_queue() {
    let h = Harness::in_memory().await;
    let feed = h.feed();
    let first = h.service.create_queue("First").await.unwrap();
    h.clock.advance_secs(1);
    let second = h.service.create_queue("Second").await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _handle = watch_active_queues(feed.as_ref(), move |queues| {
        let _ = tx.send(queues);
    })
    .await
    .unwrap();

    let ids: Vec<String> = recv(&mut rx).await.into_iter().map(|q| q.id).collect();
    assert_eq!(ids, vec![second.clone(), first.clone()]);

    h.service.close_queue(&second).await.unwrap();
    let ids: Vec<String> = recv(&mut rx).await.into_iter().map(|q| q.id).collect();
    assert_eq!(ids, vec![first]);
}
