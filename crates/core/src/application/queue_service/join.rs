// Join Queue Use Case

use crate::domain::{MemberId, QueueId};
use crate::error::{AppError, Result};
use crate::port::TransactionalQueueStore;
use serde::{Deserialize, Serialize};
use super::abort;
use tracing::{error, info};

/// Join request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub queue_id: QueueId,
    pub name: String,
    pub quantity: u32,
}

/// Ticket handed to a member who joined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinTicket {
    pub token_number: i64,
    pub member_id: MemberId,
}

/// Execute join use case (with transaction for atomicity)
///
/// The token comes from the queue's own counter, claimed in the same
/// transaction that inserts the member, so concurrent joins never share one.
pub async fn execute(store: &dyn TransactionalQueueStore, req: JoinRequest) -> Result<JoinTicket> {
    let result = join(store, &req).await;
    if let Err(e) = &result {
        error!(queue_id = %req.queue_id, error = %e, "Error joining queue");
    }
    result
}

async fn join(store: &dyn TransactionalQueueStore, req: &JoinRequest) -> Result<JoinTicket> {
    if req.quantity == 0 {
        return Err(AppError::Validation(
            "quantity must be a positive integer".to_string(),
        ));
    }

    let mut tx = store.begin_transaction().await?;

    // Claim first: the counter update doubles as the existence check
    let claim = match tx.claim_next_token(&req.queue_id).await {
        Ok(Some(claim)) => claim,
        Ok(None) => return abort(tx, AppError::queue_not_found(&req.queue_id)).await,
        Err(e) => return abort(tx, e).await,
    };

    if !claim.queue.is_active() {
        let err = AppError::InvalidState(format!(
            "Queue {} is {}",
            req.queue_id, claim.queue.status
        ));
        return abort(tx, err).await;
    }

    let member = match tx
        .insert_member(&req.queue_id, &req.name, req.quantity, claim.token_number)
        .await
    {
        Ok(member) => member,
        Err(e) => return abort(tx, e).await,
    };

    tx.commit().await?;

    info!(
        queue_id = %req.queue_id,
        member_id = %member.id,
        token_number = member.token_number,
        "Member joined queue"
    );

    Ok(JoinTicket {
        token_number: member.token_number,
        member_id: member.id,
    })
}
