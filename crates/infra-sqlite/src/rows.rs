// Row <-> domain conversion

use queueline_core::domain::{Member, Queue};
use queueline_core::error::{AppError, Result};

pub(crate) const QUEUE_COLUMNS: &str = "id, name, created_at, current_token, total_served, \
     average_serve_time, next_token, status";

pub(crate) const MEMBER_COLUMNS: &str = "id, queue_id, name, quantity, token_number, status, \
     joined_at, served_at, skipped_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct QueueRow {
    id: String,
    name: String,
    created_at: i64,
    current_token: i64,
    total_served: i64,
    average_serve_time: i64,
    next_token: i64,
    status: String,
}

impl QueueRow {
    pub(crate) fn into_queue(self) -> Result<Queue> {
        let status = self
            .status
            .parse()
            .map_err(|e: String| AppError::Database(format!("queue {}: {}", self.id, e)))?;

        Ok(Queue {
            id: self.id,
            name: self.name,
            created_at: self.created_at,
            current_token: self.current_token,
            total_served: self.total_served,
            average_serve_time: self.average_serve_time,
            next_token: self.next_token,
            status,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MemberRow {
    id: String,
    queue_id: String,
    name: String,
    quantity: i64,
    token_number: i64,
    status: String,
    joined_at: Option<i64>,
    served_at: Option<i64>,
    skipped_at: Option<i64>,
}

impl MemberRow {
    pub(crate) fn into_member(self) -> Result<Member> {
        let status = self
            .status
            .parse()
            .map_err(|e: String| AppError::Database(format!("member {}: {}", self.id, e)))?;
        let quantity = u32::try_from(self.quantity).map_err(|_| {
            AppError::Database(format!(
                "member {}: quantity {} out of range",
                self.id, self.quantity
            ))
        })?;

        Ok(Member {
            id: self.id,
            queue_id: self.queue_id,
            name: self.name,
            quantity,
            token_number: self.token_number,
            status,
            joined_at: self.joined_at,
            served_at: self.served_at,
            skipped_at: self.skipped_at,
        })
    }
}
