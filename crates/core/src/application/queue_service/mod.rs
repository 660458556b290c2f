// Queue Service - Core use cases for queue management

pub mod close;
pub mod create;
pub mod join;
pub mod serve;
pub mod skip;
pub mod ticket;

pub use join::{JoinRequest, JoinTicket};
pub use serve::ServeOutcome;

use crate::domain::{Member, MemberId, Queue, QueueId, TicketProgress};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, QueueStoreTransaction, TransactionalQueueStore};
use std::sync::Arc;
use tracing::warn;

/// Roll back after a failed step and return that step's error
async fn abort<T>(tx: Box<dyn QueueStoreTransaction>, err: AppError) -> Result<T> {
    if let Err(rollback_err) = tx.rollback().await {
        warn!(error = %rollback_err, cause = %err, "Rollback failed");
    }
    Err(err)
}

/// Queue Service
///
/// The store is injected; nothing here holds global state.
#[derive(Clone)]
pub struct QueueService {
    store: Arc<dyn TransactionalQueueStore>,
    id_provider: Arc<dyn IdProvider>,
}

impl QueueService {
    pub fn new(store: Arc<dyn TransactionalQueueStore>, id_provider: Arc<dyn IdProvider>) -> Self {
        Self { store, id_provider }
    }

    /// Create a new queue, returning its id
    pub async fn create_queue(&self, name: &str) -> Result<QueueId> {
        create::execute(self.store.as_ref(), self.id_provider.as_ref(), name).await
    }

    /// Join a queue and receive the next token
    pub async fn join_queue(&self, req: JoinRequest) -> Result<JoinTicket> {
        join::execute(self.store.as_ref(), req).await
    }

    /// Mark a waiting member as served and update queue statistics
    pub async fn mark_as_served(
        &self,
        queue_id: &QueueId,
        member_id: &MemberId,
    ) -> Result<ServeOutcome> {
        serve::execute(self.store.as_ref(), queue_id, member_id).await
    }

    /// Mark a waiting member as skipped
    pub async fn skip_token(&self, queue_id: &QueueId, member_id: &MemberId) -> Result<Member> {
        skip::execute(self.store.as_ref(), queue_id, member_id).await
    }

    /// Close a queue so it no longer takes joins or shows up as active
    pub async fn close_queue(&self, queue_id: &QueueId) -> Result<Queue> {
        close::execute(self.store.as_ref(), queue_id).await
    }

    /// Position, wait estimate and serving token for one ticket
    pub async fn ticket_status(
        &self,
        queue_id: &QueueId,
        member_id: &MemberId,
    ) -> Result<TicketProgress> {
        ticket::execute(self.store.as_ref(), queue_id, member_id).await
    }

    pub async fn get_queue(&self, queue_id: &QueueId) -> Result<Queue> {
        self.store
            .find_queue(queue_id)
            .await?
            .ok_or_else(|| AppError::queue_not_found(queue_id))
    }

    /// Members ascending by token
    pub async fn list_members(&self, queue_id: &QueueId) -> Result<Vec<Member>> {
        self.store.list_members(queue_id).await
    }

    /// Active queues, newest first
    pub async fn list_active_queues(&self) -> Result<Vec<Queue>> {
        self.store.list_active_queues().await
    }
}
