// SQLite Transaction Implementation

use crate::error::map_sqlx_error;
use crate::queue_store::{finish_member, select_queue};
use crate::rows::{MemberRow, QueueRow, MEMBER_COLUMNS, QUEUE_COLUMNS};
use async_trait::async_trait;
use queueline_core::domain::{Member, MemberId, MemberStatus, Queue, QueueId};
use queueline_core::error::{AppError, Result};
use queueline_core::port::{
    IdProvider, QueueStoreTransaction, StoreChange, TimeProvider, TokenClaim, Transaction,
};
use sqlx::{Sqlite, Transaction as SqlxTransaction};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// A deferred SQLite transaction.
///
/// Every flow opens with a write (`claim_next_token` or `mark_served`), so
/// the write lock is taken up front and concurrent joins serialize on it
/// instead of failing a read-to-write upgrade.
pub struct SqliteQueueTransaction {
    tx: SqlxTransaction<'static, Sqlite>,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
    changes: broadcast::Sender<StoreChange>,
    pending: Vec<StoreChange>,
}

impl SqliteQueueTransaction {
    pub fn new(
        tx: SqlxTransaction<'static, Sqlite>,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
        changes: broadcast::Sender<StoreChange>,
    ) -> Self {
        Self {
            tx,
            time_provider,
            id_provider,
            changes,
            pending: Vec::new(),
        }
    }

    fn stage(&mut self, change: StoreChange) {
        if !self.pending.contains(&change) {
            self.pending.push(change);
        }
    }
}

#[async_trait]
impl Transaction for SqliteQueueTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        let SqliteQueueTransaction {
            tx,
            changes,
            pending,
            ..
        } = *self;
        tx.commit().await.map_err(map_sqlx_error)?;

        for change in pending {
            // No receivers is fine
            let _ = changes.send(change);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl QueueStoreTransaction for SqliteQueueTransaction {
    async fn claim_next_token(&mut self, queue_id: &QueueId) -> Result<Option<TokenClaim>> {
        let sql = format!(
            "UPDATE queues SET next_token = next_token + 1 WHERE id = ? RETURNING {}",
            QUEUE_COLUMNS
        );
        let row: Option<QueueRow> = sqlx::query_as(&sql)
            .bind(queue_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let queue = row.into_queue()?;
        debug!(queue_id = %queue_id, token = queue.next_token - 1, "Token claimed");

        self.stage(StoreChange::Queue {
            queue_id: queue_id.clone(),
        });
        Ok(Some(TokenClaim {
            token_number: queue.next_token - 1,
            queue,
        }))
    }

    async fn insert_member(
        &mut self,
        queue_id: &QueueId,
        name: &str,
        quantity: u32,
        token_number: i64,
    ) -> Result<Member> {
        let id = self.id_provider.generate_id();
        let now = self.time_provider.now_millis();

        let sql = format!(
            r#"
            INSERT INTO members (id, queue_id, name, quantity, token_number, status, joined_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            MEMBER_COLUMNS
        );
        let row: MemberRow = sqlx::query_as(&sql)
            .bind(&id)
            .bind(queue_id)
            .bind(name)
            .bind(i64::from(quantity))
            .bind(token_number)
            .bind(MemberStatus::Waiting.as_str())
            .bind(now)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| match map_sqlx_error(e) {
                AppError::NotFound(_) => AppError::queue_not_found(queue_id),
                other => other,
            })?;

        let member = row.into_member()?;
        self.stage(StoreChange::Member {
            queue_id: queue_id.clone(),
            member_id: member.id.clone(),
        });
        Ok(member)
    }

    async fn mark_served(&mut self, queue_id: &QueueId, member_id: &MemberId) -> Result<Member> {
        let now = self.time_provider.now_millis();
        let member =
            finish_member(&mut self.tx, queue_id, member_id, MemberStatus::Served, now).await?;

        self.stage(StoreChange::Member {
            queue_id: queue_id.clone(),
            member_id: member_id.clone(),
        });
        Ok(member)
    }

    async fn find_queue(&mut self, queue_id: &QueueId) -> Result<Option<Queue>> {
        select_queue(&mut self.tx, queue_id).await
    }

    async fn record_serve(
        &mut self,
        queue_id: &QueueId,
        token_number: i64,
        average_serve_time: i64,
    ) -> Result<Queue> {
        let sql = format!(
            r#"
            UPDATE queues
            SET current_token = ?, average_serve_time = ?, total_served = total_served + 1
            WHERE id = ?
            RETURNING {}
            "#,
            QUEUE_COLUMNS
        );
        let row: Option<QueueRow> = sqlx::query_as(&sql)
            .bind(token_number)
            .bind(average_serve_time)
            .bind(queue_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        let queue = row
            .ok_or_else(|| AppError::queue_not_found(queue_id))?
            .into_queue()?;

        self.stage(StoreChange::Queue {
            queue_id: queue_id.clone(),
        });
        Ok(queue)
    }
}
