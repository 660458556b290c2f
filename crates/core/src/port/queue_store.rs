// Queue Store Port (the external document store)

use crate::domain::{Member, MemberId, Queue, QueueId, QueueStatus};
use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Capacity of the change broadcast channel each store owns
pub const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// A committed write, published once the write is durable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// `queues/{queue_id}` changed (created, stats, status, token counter)
    Queue { queue_id: QueueId },
    /// `queues/{queue_id}/members/{member_id}` changed (joined, served, skipped)
    Member {
        queue_id: QueueId,
        member_id: MemberId,
    },
}

/// Store interface for Queue and Member documents
///
/// Single-document writes live here; multi-document writes go through
/// [`crate::port::TransactionalQueueStore`].
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Create a queue document with a store-assigned `created_at`
    async fn create_queue(&self, id: &QueueId, name: &str) -> Result<Queue>;

    /// Find queue by ID
    async fn find_queue(&self, id: &QueueId) -> Result<Option<Queue>>;

    /// Find a member of a queue
    async fn find_member(&self, queue_id: &QueueId, member_id: &MemberId)
        -> Result<Option<Member>>;

    /// All members of a queue, ascending by token number
    async fn list_members(&self, queue_id: &QueueId) -> Result<Vec<Member>>;

    /// Active queues, newest first
    async fn list_active_queues(&self) -> Result<Vec<Queue>>;

    /// waiting -> skipped, stamping `skipped_at`
    ///
    /// Fails with NotFound for an unknown member and InvalidState when the
    /// member is no longer waiting.
    async fn skip_member(&self, queue_id: &QueueId, member_id: &MemberId) -> Result<Member>;

    /// Set queue status (NotFound if the queue does not exist)
    async fn set_queue_status(&self, queue_id: &QueueId, status: QueueStatus) -> Result<Queue>;

    /// Listen for committed changes
    fn changes(&self) -> broadcast::Receiver<StoreChange>;
}
