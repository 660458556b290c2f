//! Queue state survives closing and reopening the database

use queueline_core::application::queue_service::JoinRequest;
use queueline_core::domain::MemberStatus;
use queueline_core::port::id_provider::mocks::SequentialIdProvider;
use queueline_integration_tests::Harness;
use std::sync::Arc;

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queueline.db");

    let (queue_id, served_id) = {
        let h = Harness::at_path(&path, Arc::new(SequentialIdProvider::new("q"))).await;
        let queue_id = h.service.create_queue("Barber").await.unwrap();

        let mut ids = Vec::new();
        for name in ["Ada", "Bob"] {
            let ticket = h
                .service
                .join_queue(JoinRequest {
                    queue_id: queue_id.clone(),
                    name: name.to_string(),
                    quantity: 1,
                })
                .await
                .unwrap();
            ids.push(ticket.member_id);
        }

        h.clock.advance_secs(300);
        h.service.mark_as_served(&queue_id, &ids[0]).await.unwrap();
        (queue_id, ids.remove(0))
    };

    // Reopen: migrations are skipped and the counter carries on
    let h = Harness::at_path(&path, Arc::new(SequentialIdProvider::new("r"))).await;
    let queue = h.service.get_queue(&queue_id).await.unwrap();
    assert_eq!(queue.name, "Barber");
    assert_eq!(queue.total_served, 1);
    assert_eq!(queue.current_token, 1);
    assert_eq!(queue.average_serve_time, 300);

    let members = h.service.list_members(&queue_id).await.unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].id, served_id);
    assert_eq!(members[0].status, MemberStatus::Served);
    assert_eq!(members[1].status, MemberStatus::Waiting);

    let ticket = h
        .service
        .join_queue(JoinRequest {
            queue_id: queue_id.clone(),
            name: "Cy".to_string(),
            quantity: 3,
        })
        .await
        .unwrap();
    assert_eq!(ticket.token_number, 3);
}
