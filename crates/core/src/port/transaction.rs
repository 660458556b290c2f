// Transaction port for atomic operations

use crate::domain::{Member, MemberId, Queue, QueueId};
use crate::error::Result;
use crate::port::QueueStore;
use async_trait::async_trait;

/// Transaction trait for atomic multi-step operations
#[async_trait]
pub trait Transaction: Send {
    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Transactional QueueStore operations
#[async_trait]
pub trait TransactionalQueueStore: QueueStore {
    /// Begin a new transaction
    async fn begin_transaction(&self) -> Result<Box<dyn QueueStoreTransaction>>;
}

/// Result of claiming a token from a queue's counter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaim {
    pub token_number: i64,
    /// Queue state after the counter moved
    pub queue: Queue,
}

/// QueueStore operations within a transaction
///
/// Changes become visible (and are published) only on commit.
#[async_trait]
pub trait QueueStoreTransaction: Transaction {
    /// Atomically increment `next_token`, returning the pre-increment value.
    /// None if the queue does not exist.
    async fn claim_next_token(&mut self, queue_id: &QueueId) -> Result<Option<TokenClaim>>;

    /// Insert a waiting member; the store assigns id and `joined_at`
    async fn insert_member(
        &mut self,
        queue_id: &QueueId,
        name: &str,
        quantity: u32,
        token_number: i64,
    ) -> Result<Member>;

    /// waiting -> served, stamping `served_at`
    ///
    /// Fails with NotFound for an unknown member and InvalidState when the
    /// member is no longer waiting.
    async fn mark_served(&mut self, queue_id: &QueueId, member_id: &MemberId) -> Result<Member>;

    /// Find queue by ID (within transaction)
    async fn find_queue(&mut self, queue_id: &QueueId) -> Result<Option<Queue>>;

    /// Set `current_token` and `average_serve_time`, increment `total_served`
    async fn record_serve(
        &mut self,
        queue_id: &QueueId,
        token_number: i64,
        average_serve_time: i64,
    ) -> Result<Queue>;
}
