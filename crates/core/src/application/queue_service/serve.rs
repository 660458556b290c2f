// Serve Member Use Case

use crate::domain::{MemberId, QueueId};
use crate::error::{AppError, Result};
use crate::port::{QueueStoreTransaction, TransactionalQueueStore};
use serde::{Deserialize, Serialize};
use super::abort;
use tracing::{error, info};

/// What serving a member did to the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServeOutcome {
    pub token_number: i64,
    /// Measured join-to-serve time; None when the join time is unknown
    pub serve_time_secs: Option<i64>,
    pub average_serve_time: i64,
    pub total_served: i64,
}

/// Execute serve use case
///
/// Member transition and queue statistics are written in one transaction.
pub async fn execute(
    store: &dyn TransactionalQueueStore,
    queue_id: &QueueId,
    member_id: &MemberId,
) -> Result<ServeOutcome> {
    let result = serve_in_transaction(store, queue_id, member_id).await;
    match &result {
        Ok(outcome) => info!(
            queue_id = %queue_id,
            member_id = %member_id,
            token_number = outcome.token_number,
            average_serve_time = outcome.average_serve_time,
            total_served = outcome.total_served,
            "Member served"
        ),
        Err(e) => {
            error!(queue_id = %queue_id, member_id = %member_id, error = %e, "Error marking as served")
        }
    }
    result
}

async fn serve_in_transaction(
    store: &dyn TransactionalQueueStore,
    queue_id: &QueueId,
    member_id: &MemberId,
) -> Result<ServeOutcome> {
    let mut tx = store.begin_transaction().await?;

    match serve(tx.as_mut(), queue_id, member_id).await {
        Ok(outcome) => {
            tx.commit().await?;
            Ok(outcome)
        }
        Err(e) => abort(tx, e).await,
    }
}

async fn serve(
    tx: &mut dyn QueueStoreTransaction,
    queue_id: &QueueId,
    member_id: &MemberId,
) -> Result<ServeOutcome> {
    // Write first so the store takes its write lock before any read
    let member = tx.mark_served(queue_id, member_id).await?;

    let mut queue = tx
        .find_queue(queue_id)
        .await?
        .ok_or_else(|| AppError::queue_not_found(queue_id))?;

    let serve_time_secs = member.serve_time_secs();
    queue.record_serve(member.token_number, serve_time_secs);

    let updated = tx
        .record_serve(queue_id, member.token_number, queue.average_serve_time)
        .await?;

    Ok(ServeOutcome {
        token_number: member.token_number,
        serve_time_secs,
        average_serve_time: updated.average_serve_time,
        total_served: updated.total_served,
    })
}
