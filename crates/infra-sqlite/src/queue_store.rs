// SQLite QueueStore Implementation

use crate::error::map_sqlx_error;
use crate::rows::{MemberRow, QueueRow, MEMBER_COLUMNS, QUEUE_COLUMNS};
use crate::SqliteQueueTransaction;
use async_trait::async_trait;
use queueline_core::domain::{
    Member, MemberId, MemberStatus, Queue, QueueId, QueueStatus, DEFAULT_AVERAGE_SERVE_TIME_SECS,
};
use queueline_core::error::{AppError, Result};
use queueline_core::port::queue_store::CHANGE_CHANNEL_CAPACITY;
use queueline_core::port::{
    IdProvider, QueueStore, QueueStoreTransaction, StoreChange, TimeProvider,
    TransactionalQueueStore,
};
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

pub struct SqliteQueueStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
    changes: broadcast::Sender<StoreChange>,
}

impl SqliteQueueStore {
    pub fn new(
        pool: SqlitePool,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
    ) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            pool,
            time_provider,
            id_provider,
            changes,
        }
    }

    fn publish(&self, change: StoreChange) {
        // No receivers is fine
        let _ = self.changes.send(change);
    }
}

/// Move a waiting member to `target`, stamping the matching timestamp column.
///
/// The update only matches waiting rows; on a miss the member is looked up
/// again to tell NotFound from InvalidState.
pub(crate) async fn finish_member(
    conn: &mut SqliteConnection,
    queue_id: &QueueId,
    member_id: &MemberId,
    target: MemberStatus,
    now: i64,
) -> Result<Member> {
    let stamp_column = match target {
        MemberStatus::Served => "served_at",
        MemberStatus::Skipped => "skipped_at",
        MemberStatus::Waiting => {
            return Err(AppError::InvalidState(
                "members cannot return to waiting".to_string(),
            ))
        }
    };

    let sql = format!(
        "UPDATE members SET status = ?, {} = ? \
         WHERE queue_id = ? AND id = ? AND status = 'waiting' \
         RETURNING {}",
        stamp_column, MEMBER_COLUMNS
    );
    let row: Option<MemberRow> = sqlx::query_as(&sql)
        .bind(target.as_str())
        .bind(now)
        .bind(queue_id)
        .bind(member_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

    if let Some(row) = row {
        return row.into_member();
    }

    let current: Option<String> =
        sqlx::query_scalar("SELECT status FROM members WHERE queue_id = ? AND id = ?")
            .bind(queue_id)
            .bind(member_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

    match current {
        None => Err(AppError::member_not_found(queue_id, member_id)),
        Some(status) => Err(AppError::InvalidState(format!(
            "Invalid state transition from {} to {}",
            status, target
        ))),
    }
}

pub(crate) async fn select_queue(
    conn: &mut SqliteConnection,
    queue_id: &QueueId,
) -> Result<Option<Queue>> {
    let sql = format!("SELECT {} FROM queues WHERE id = ?", QUEUE_COLUMNS);
    let row: Option<QueueRow> = sqlx::query_as(&sql)
        .bind(queue_id)
        .fetch_optional(conn)
        .await
        .map_err(map_sqlx_error)?;

    row.map(QueueRow::into_queue).transpose()
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn create_queue(&self, id: &QueueId, name: &str) -> Result<Queue> {
        let now = self.time_provider.now_millis();

        // Replaces the queue document; members and the token counter are kept
        let sql = format!(
            r#"
            INSERT INTO queues (id, name, created_at, current_token, total_served,
                                average_serve_time, next_token, status)
            VALUES (?, ?, ?, 0, 0, ?, 1, 'active')
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                created_at = excluded.created_at,
                current_token = 0,
                total_served = 0,
                average_serve_time = excluded.average_serve_time,
                status = 'active'
            RETURNING {}
            "#,
            QUEUE_COLUMNS
        );
        let row: QueueRow = sqlx::query_as(&sql)
            .bind(id)
            .bind(name)
            .bind(now)
            .bind(DEFAULT_AVERAGE_SERVE_TIME_SECS)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let queue = row.into_queue()?;
        debug!(queue_id = %queue.id, "Queue document written");
        self.publish(StoreChange::Queue {
            queue_id: id.clone(),
        });
        Ok(queue)
    }

    async fn find_queue(&self, id: &QueueId) -> Result<Option<Queue>> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        select_queue(&mut conn, id).await
    }

    async fn find_member(
        &self,
        queue_id: &QueueId,
        member_id: &MemberId,
    ) -> Result<Option<Member>> {
        let sql = format!(
            "SELECT {} FROM members WHERE queue_id = ? AND id = ?",
            MEMBER_COLUMNS
        );
        let row: Option<MemberRow> = sqlx::query_as(&sql)
            .bind(queue_id)
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(MemberRow::into_member).transpose()
    }

    async fn list_members(&self, queue_id: &QueueId) -> Result<Vec<Member>> {
        let sql = format!(
            "SELECT {} FROM members WHERE queue_id = ? ORDER BY token_number ASC",
            MEMBER_COLUMNS
        );
        let rows: Vec<MemberRow> = sqlx::query_as(&sql)
            .bind(queue_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(MemberRow::into_member).collect()
    }

    async fn list_active_queues(&self) -> Result<Vec<Queue>> {
        let sql = format!(
            "SELECT {} FROM queues WHERE status = 'active' ORDER BY created_at DESC, id ASC",
            QUEUE_COLUMNS
        );
        let rows: Vec<QueueRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(QueueRow::into_queue).collect()
    }

    async fn skip_member(&self, queue_id: &QueueId, member_id: &MemberId) -> Result<Member> {
        let now = self.time_provider.now_millis();
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        let member = finish_member(&mut conn, queue_id, member_id, MemberStatus::Skipped, now)
            .await?;
        drop(conn);

        self.publish(StoreChange::Member {
            queue_id: queue_id.clone(),
            member_id: member_id.clone(),
        });
        Ok(member)
    }

    async fn set_queue_status(&self, queue_id: &QueueId, status: QueueStatus) -> Result<Queue> {
        let sql = format!(
            "UPDATE queues SET status = ? WHERE id = ? RETURNING {}",
            QUEUE_COLUMNS
        );
        let row: Option<QueueRow> = sqlx::query_as(&sql)
            .bind(status.as_str())
            .bind(queue_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let queue = row
            .ok_or_else(|| AppError::queue_not_found(queue_id))?
            .into_queue()?;
        self.publish(StoreChange::Queue {
            queue_id: queue_id.clone(),
        });
        Ok(queue)
    }

    fn changes(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

#[async_trait]
impl TransactionalQueueStore for SqliteQueueStore {
    async fn begin_transaction(&self) -> Result<Box<dyn QueueStoreTransaction>> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Box::new(SqliteQueueTransaction::new(
            tx,
            Arc::clone(&self.time_provider),
            Arc::clone(&self.id_provider),
            self.changes.clone(),
        )))
    }
}
