//! RPC Method Handlers
//!
//! Implements the business logic for each JSON-RPC method.

use crate::error::to_rpc_error;
use crate::types::{
    CreateQueueRequest, CreateQueueResponse, JoinQueueRequest, JoinQueueResponse,
    ListQueuesRequest, ListQueuesResponse, MemberRequest, MembersResponse, QueueRequest,
    QueueResponse, ServeResponse, SkipResponse, TicketStatusResponse,
};
use jsonrpsee::types::ErrorObjectOwned;
use queueline_core::application::queue_service::JoinRequest;
use queueline_core::application::{watch_members, watch_queue, QueueService, WatchHandle};
use queueline_core::domain::{format_wait_time, join_url, Member, Queue, QueueId};
use queueline_core::error::AppError;
use queueline_core::port::ChangeFeed;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Live subscription: snapshots arrive on `updates` until `handle` is cancelled
pub struct Watch<T> {
    pub handle: WatchHandle,
    pub updates: mpsc::UnboundedReceiver<T>,
}

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    service: QueueService,
    feed: Arc<dyn ChangeFeed>,
    /// Organizer page the share links are derived from
    public_url: String,
}

impl RpcHandler {
    pub fn new(service: QueueService, feed: Arc<dyn ChangeFeed>, public_url: String) -> Self {
        Self {
            service,
            feed,
            public_url,
        }
    }

    /// queue.create.v1
    pub async fn create_queue(
        &self,
        params: CreateQueueRequest,
    ) -> Result<CreateQueueResponse, ErrorObjectOwned> {
        let queue_id = self
            .service
            .create_queue(&params.name)
            .await
            .map_err(to_rpc_error)?;

        let join_url = join_url(&self.public_url, &queue_id)
            .map_err(|e| to_rpc_error(AppError::from(e)))?;

        Ok(CreateQueueResponse { queue_id, join_url })
    }

    /// queue.join.v1
    pub async fn join_queue(
        &self,
        params: JoinQueueRequest,
    ) -> Result<JoinQueueResponse, ErrorObjectOwned> {
        let quantity = params.quantity.resolve().map_err(to_rpc_error)?;

        let ticket = self
            .service
            .join_queue(JoinRequest {
                queue_id: params.queue_id.clone(),
                name: params.name,
                quantity,
            })
            .await
            .map_err(to_rpc_error)?;

        Ok(JoinQueueResponse {
            queue_id: params.queue_id,
            member_id: ticket.member_id,
            token_number: ticket.token_number,
        })
    }

    /// queue.serve.v1
    pub async fn serve(&self, params: MemberRequest) -> Result<ServeResponse, ErrorObjectOwned> {
        let outcome = self
            .service
            .mark_as_served(&params.queue_id, &params.member_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(ServeResponse {
            member_id: params.member_id,
            token_number: outcome.token_number,
            serve_time_secs: outcome.serve_time_secs,
            average_serve_time: outcome.average_serve_time,
            total_served: outcome.total_served,
        })
    }

    /// queue.skip.v1
    pub async fn skip(&self, params: MemberRequest) -> Result<SkipResponse, ErrorObjectOwned> {
        let member = self
            .service
            .skip_token(&params.queue_id, &params.member_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(SkipResponse { member })
    }

    /// queue.close.v1
    pub async fn close(&self, params: QueueRequest) -> Result<QueueResponse, ErrorObjectOwned> {
        let queue = self
            .service
            .close_queue(&params.queue_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(QueueResponse { queue })
    }

    /// queue.get.v1
    pub async fn get_queue(&self, params: QueueRequest) -> Result<QueueResponse, ErrorObjectOwned> {
        let queue = self
            .service
            .get_queue(&params.queue_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(QueueResponse { queue })
    }

    /// queue.members.v1
    pub async fn members(&self, params: QueueRequest) -> Result<MembersResponse, ErrorObjectOwned> {
        let members = self
            .service
            .list_members(&params.queue_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(MembersResponse { members })
    }

    /// queue.list.v1
    pub async fn list_queues(
        &self,
        _params: ListQueuesRequest,
    ) -> Result<ListQueuesResponse, ErrorObjectOwned> {
        let queues = self
            .service
            .list_active_queues()
            .await
            .map_err(to_rpc_error)?;

        Ok(ListQueuesResponse { queues })
    }

    /// ticket.status.v1
    pub async fn ticket_status(
        &self,
        params: MemberRequest,
    ) -> Result<TicketStatusResponse, ErrorObjectOwned> {
        let progress = self
            .service
            .ticket_status(&params.queue_id, &params.member_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(TicketStatusResponse {
            estimated_wait: format_wait_time(progress.estimated_wait_secs),
            progress,
        })
    }

    /// queue.watch.v1
    pub async fn watch_queue(
        &self,
        queue_id: &QueueId,
    ) -> Result<Watch<Option<Queue>>, ErrorObjectOwned> {
        let (tx, updates) = mpsc::unbounded_channel();
        let handle = watch_queue(self.feed.as_ref(), queue_id, move |queue| {
            // Receiver gone means the subscriber is winding down
            let _ = tx.send(queue);
        })
        .await
        .map_err(to_rpc_error)?;

        Ok(Watch { handle, updates })
    }

    /// members.watch.v1
    pub async fn watch_members(
        &self,
        queue_id: &QueueId,
    ) -> Result<Watch<Vec<Member>>, ErrorObjectOwned> {
        let (tx, updates) = mpsc::unbounded_channel();
        let handle = watch_members(self.feed.as_ref(), queue_id, move |members| {
            let _ = tx.send(members);
        })
        .await
        .map_err(to_rpc_error)?;

        Ok(Watch { handle, updates })
    }
}
