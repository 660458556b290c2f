//! RPC Request/Response Types
//!
//! JSON-RPC method parameters and results. Field names are camelCase on the
//! wire, like the stored documents.

use queueline_core::domain::{parse_quantity, Member, MemberId, Queue, QueueId, TicketProgress};
use queueline_core::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// queue.create.v1
#[derive(Debug, Deserialize)]
pub struct CreateQueueRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQueueResponse {
    pub queue_id: QueueId,
    pub join_url: String,
}

/// Party size as a number or as typed text ("3", "3 people")
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Number(i64),
    /// Non-integral numbers are truncated toward zero
    Fraction(f64),
    Text(String),
}

impl Quantity {
    pub fn resolve(&self) -> Result<u32> {
        match self {
            Quantity::Number(n) => u32::try_from(*n)
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| AppError::Validation(format!("Invalid quantity: {}", n))),
            Quantity::Fraction(n) => {
                let whole = n.trunc();
                if (1.0..=f64::from(u32::MAX)).contains(&whole) {
                    Ok(whole as u32)
                } else {
                    Err(AppError::Validation(format!("Invalid quantity: {}", n)))
                }
            }
            Quantity::Text(text) => Ok(parse_quantity(text)?),
        }
    }
}

/// queue.join.v1
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinQueueRequest {
    pub queue_id: QueueId,
    pub name: String,
    pub quantity: Quantity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinQueueResponse {
    pub queue_id: QueueId,
    pub member_id: MemberId,
    pub token_number: i64,
}

/// queue.serve.v1, queue.skip.v1, ticket.status.v1
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRequest {
    pub queue_id: QueueId,
    pub member_id: MemberId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServeResponse {
    pub member_id: MemberId,
    pub token_number: i64,
    pub serve_time_secs: Option<i64>,
    pub average_serve_time: i64,
    pub total_served: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkipResponse {
    pub member: Member,
}

/// queue.close.v1, queue.get.v1, queue.members.v1, queue.watch.v1,
/// members.watch.v1
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueRequest {
    pub queue_id: QueueId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueResponse {
    pub queue: Queue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembersResponse {
    pub members: Vec<Member>,
}

/// queue.list.v1
#[derive(Debug, Deserialize)]
pub struct ListQueuesRequest {
    // No parameters needed
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListQueuesResponse {
    pub queues: Vec<Queue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketStatusResponse {
    #[serde(flatten)]
    pub progress: TicketProgress,
    /// `estimated_wait_secs` rendered for display
    pub estimated_wait: String,
}

/// Payload of a `queue.changed` notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueChanged {
    /// None once the queue document is gone
    pub queue: Option<Queue>,
}

/// Payload of a `members.changed` notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembersChanged {
    pub members: Vec<Member>,
}
