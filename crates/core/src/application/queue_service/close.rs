// Close Queue Use Case

use crate::domain::{Queue, QueueId, QueueStatus};
use crate::error::Result;
use crate::port::QueueStore;
use tracing::{error, info};

/// Execute close use case (idempotent)
pub async fn execute(store: &dyn QueueStore, queue_id: &QueueId) -> Result<Queue> {
    let queue = store
        .set_queue_status(queue_id, QueueStatus::Closed)
        .await
        .map_err(|e| {
            error!(queue_id = %queue_id, error = %e, "Error closing queue");
            e
        })?;

    info!(queue_id = %queue_id, total_served = queue.total_served, "Queue closed");
    Ok(queue)
}
