// Ticket Status Use Case (what a customer's page shows)

use crate::domain::{MemberId, QueueId, TicketProgress};
use crate::error::{AppError, Result};
use crate::port::QueueStore;

/// Execute ticket status lookup
pub async fn execute(
    store: &dyn QueueStore,
    queue_id: &QueueId,
    member_id: &MemberId,
) -> Result<TicketProgress> {
    let queue = store
        .find_queue(queue_id)
        .await?
        .ok_or_else(|| AppError::queue_not_found(queue_id))?;

    let members = store.list_members(queue_id).await?;
    let member = members
        .iter()
        .find(|m| &m.id == member_id)
        .cloned()
        .ok_or_else(|| AppError::member_not_found(queue_id, member_id))?;

    Ok(TicketProgress::compute(
        member,
        &members,
        queue.average_serve_time,
    ))
}
