//! End-to-end queue lifecycle against the SQLite store

use queueline_core::application::queue_service::{JoinRequest, JoinTicket};
use queueline_core::domain::{MemberStatus, QueueStatus};
use queueline_core::error::AppError;
use queueline_integration_tests::Harness;
use tokio_test::{assert_err, assert_ok};

async fn join(h: &Harness, queue_id: &str, name: &str, quantity: u32) -> JoinTicket {
    h.service
        .join_queue(JoinRequest {
            queue_id: queue_id.to_string(),
            name: name.to_string(),
            quantity,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_new_queue_defaults() {
    let h = Harness::in_memory().await;
    let queue_id = h.service.create_queue("Bakery").await.unwrap();

    let queue = h.service.get_queue(&queue_id).await.unwrap();
    assert_eq!(queue.name, "Bakery");
    assert_eq!(queue.total_served, 0);
    assert_eq!(queue.current_token, 0);
    assert_eq!(queue.average_serve_time, 120);
    assert_eq!(queue.status, QueueStatus::Active);
    assert_eq!(queue.created_at, 1_700_000_000_000);
}

#[tokio::test]
async fn test_tokens_are_sequential() {
    let h = Harness::in_memory().await;
    let queue_id = h.service.create_queue("Deli").await.unwrap();

    let tokens: Vec<i64> = {
        let mut tokens = Vec::new();
        for name in ["Ada", "Bob", "Cy"] {
            tokens.push(join(&h, &queue_id, name, 1).await.token_number);
        }
        tokens
    };
    assert_eq!(tokens, vec![1, 2, 3]);

    let members = h.service.list_members(&queue_id).await.unwrap();
    assert_eq!(members.len(), 3);
    assert!(members.iter().all(|m| m.status == MemberStatus::Waiting));
}

#[tokio::test]
async fn test_serve_updates_running_average() {
    let h = Harness::in_memory().await;
    let queue_id = h.service.create_queue("Deli").await.unwrap();
    let first = join(&h, &queue_id, "Ada", 2).await;
    let second = join(&h, &queue_id, "Bob", 1).await;

    h.clock.advance_secs(60);
    let outcome = h
        .service
        .mark_as_served(&queue_id, &first.member_id)
        .await
        .unwrap();
    assert_eq!(outcome.serve_time_secs, Some(60));
    assert_eq!(outcome.average_serve_time, 60);

    h.clock.advance_secs(120);
    let outcome = h
        .service
        .mark_as_served(&queue_id, &second.member_id)
        .await
        .unwrap();
    assert_eq!(outcome.serve_time_secs, Some(180));
    assert_eq!(outcome.average_serve_time, 120);

    let queue = h.service.get_queue(&queue_id).await.unwrap();
    assert_eq!(queue.current_token, 2);
    assert_eq!(queue.total_served, 2);
    assert_eq!(queue.average_serve_time, 120);

    let err = assert_err!(h.service.mark_as_served(&queue_id, &first.member_id).await);
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn test_skip_leaves_statistics_alone() {
    let h = Harness::in_memory().await;
    let queue_id = h.service.create_queue("Deli").await.unwrap();
    let first = join(&h, &queue_id, "Ada", 1).await;
    let second = join(&h, &queue_id, "Bob", 1).await;
    let third = join(&h, &queue_id, "Cy", 1).await;

    let before = h.service.get_queue(&queue_id).await.unwrap();
    let skipped = assert_ok!(h.service.skip_token(&queue_id, &first.member_id).await);
    assert_eq!(skipped.status, MemberStatus::Skipped);

    let after = h.service.get_queue(&queue_id).await.unwrap();
    assert_eq!(after.current_token, before.current_token);
    assert_eq!(after.total_served, before.total_served);
    assert_eq!(after.average_serve_time, before.average_serve_time);

    // Skipped member no longer counts toward anyone's position
    let progress = h
        .service
        .ticket_status(&queue_id, &third.member_id)
        .await
        .unwrap();
    assert_eq!(progress.position, 2);
    assert_eq!(progress.estimated_wait_secs, 120);
    assert_eq!(progress.now_serving, Some(second.token_number));
}

#[tokio::test]
async fn test_closed_queue_rejects_joins() {
    let h = Harness::in_memory().await;
    let queue_id = h.service.create_queue("Deli").await.unwrap();
    join(&h, &queue_id, "Ada", 1).await;

    let closed = h.service.close_queue(&queue_id).await.unwrap();
    assert_eq!(closed.status, QueueStatus::Closed);
    assert!(h.service.list_active_queues().await.unwrap().is_empty());

    let err = assert_err!(
        h.service
            .join_queue(JoinRequest {
                queue_id: queue_id.clone(),
                name: "Late".to_string(),
                quantity: 1,
            })
            .await
    );
    assert!(matches!(err, AppError::InvalidState(_)));

    // The rejected join did not burn a token
    assert_eq!(h.service.get_queue(&queue_id).await.unwrap().next_token, 2);
}

#[tokio::test]
async fn test_unknown_queue_and_member() {
    let h = Harness::in_memory().await;

    let err = assert_err!(h.service.get_queue(&"nope".to_string()).await);
    assert!(err.is_not_found());

    let err = assert_err!(
        h.service
            .join_queue(JoinRequest {
                queue_id: "nope".to_string(),
                name: "Ada".to_string(),
                quantity: 1,
            })
            .await
    );
    assert!(err.is_not_found());

    let queue_id = h.service.create_queue("Deli").await.unwrap();
    let err = assert_err!(
        h.service
            .ticket_status(&queue_id, &"ghost".to_string())
            .await
    );
    assert!(err.is_not_found());
}
