// Create Queue Use Case

use crate::domain::QueueId;
use crate::error::Result;
use crate::port::{IdProvider, QueueStore};
use tracing::{error, info};

/// Execute create use case
///
/// The name is stored as given; empty names are accepted.
pub async fn execute(
    store: &dyn QueueStore,
    id_provider: &dyn IdProvider,
    name: &str,
) -> Result<QueueId> {
    let queue_id = id_provider.generate_id();

    let queue = store.create_queue(&queue_id, name).await.map_err(|e| {
        error!(queue_id = %queue_id, error = %e, "Error creating queue");
        e
    })?;

    info!(queue_id = %queue.id, name = %queue.name, "Queue created");
    Ok(queue.id)
}
