// Skip Member Use Case

use crate::domain::{Member, MemberId, QueueId};
use crate::error::Result;
use crate::port::QueueStore;
use tracing::{error, info};

/// Execute skip use case
///
/// Queue statistics (`current_token`, `total_served`, `average_serve_time`)
/// are left alone.
pub async fn execute(
    store: &dyn QueueStore,
    queue_id: &QueueId,
    member_id: &MemberId,
) -> Result<Member> {
    let member = store.skip_member(queue_id, member_id).await.map_err(|e| {
        error!(queue_id = %queue_id, member_id = %member_id, error = %e, "Error skipping token");
        e
    })?;

    info!(
        queue_id = %queue_id,
        member_id = %member_id,
        token_number = member.token_number,
        "Token skipped"
    );
    Ok(member)
}
