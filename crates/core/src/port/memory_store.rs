// In-memory QueueStore (tests, demos)
//
// Same capability set as the SQLite adapter. A transaction holds the state
// lock for its whole lifetime and works on a copy, so commit is all-or-nothing.

use crate::domain::{Member, MemberId, Queue, QueueId, QueueStatus};
use crate::error::{AppError, Result};
use crate::port::queue_store::CHANGE_CHANNEL_CAPACITY;
use crate::port::{
    IdProvider, QueueStore, QueueStoreTransaction, StoreChange, TimeProvider, TokenClaim,
    Transaction, TransactionalQueueStore,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard};

#[derive(Debug, Default, Clone)]
struct State {
    queues: HashMap<QueueId, Queue>,
    members: HashMap<QueueId, Vec<Member>>,
}

impl State {
    fn member_mut(&mut self, queue_id: &str, member_id: &str) -> Option<&mut Member> {
        self.members
            .get_mut(queue_id)?
            .iter_mut()
            .find(|m| m.id == member_id)
    }
}

/// Shared pieces both the store and its transactions need
#[derive(Clone)]
struct Shared {
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
    changes: broadcast::Sender<StoreChange>,
    fail_writes: Arc<AtomicBool>,
    fail_commits: Arc<AtomicBool>,
    fail_rollbacks: Arc<AtomicBool>,
}

impl Shared {
    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("write rejected by store".to_string()));
        }
        Ok(())
    }

    fn publish(&self, change: StoreChange) {
        // No receivers is fine
        let _ = self.changes.send(change);
    }
}

pub struct InMemoryQueueStore {
    state: Arc<Mutex<State>>,
    shared: Shared,
}

impl InMemoryQueueStore {
    pub fn new(time_provider: Arc<dyn TimeProvider>, id_provider: Arc<dyn IdProvider>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(State::default())),
            shared: Shared {
                time_provider,
                id_provider,
                changes,
                fail_writes: Arc::new(AtomicBool::new(false)),
                fail_commits: Arc::new(AtomicBool::new(false)),
                fail_rollbacks: Arc::new(AtomicBool::new(false)),
            },
        }
    }

    /// Make every subsequent write fail with a Database error (or stop doing so)
    pub fn fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make transaction commits fail; the working copy is discarded
    pub fn fail_commits(&self, fail: bool) {
        self.shared.fail_commits.store(fail, Ordering::SeqCst);
    }

    pub fn fail_rollbacks(&self, fail: bool) {
        self.shared.fail_rollbacks.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn create_queue(&self, id: &QueueId, name: &str) -> Result<Queue> {
        self.shared.check_writable()?;
        let mut queue = Queue::new(id.clone(), name, self.shared.time_provider.now_millis());

        // Replaces the queue document; members and the token counter are kept
        let mut state = self.state.lock().await;
        if let Some(existing) = state.queues.get(id) {
            queue.next_token = existing.next_token;
        }
        state.queues.insert(id.clone(), queue.clone());
        state.members.entry(id.clone()).or_default();
        drop(state);

        self.shared.publish(StoreChange::Queue {
            queue_id: id.clone(),
        });
        Ok(queue)
    }

    async fn find_queue(&self, id: &QueueId) -> Result<Option<Queue>> {
        Ok(self.state.lock().await.queues.get(id).cloned())
    }

    async fn find_member(
        &self,
        queue_id: &QueueId,
        member_id: &MemberId,
    ) -> Result<Option<Member>> {
        let state = self.state.lock().await;
        Ok(state
            .members
            .get(queue_id)
            .and_then(|members| members.iter().find(|m| &m.id == member_id))
            .cloned())
    }

    async fn list_members(&self, queue_id: &QueueId) -> Result<Vec<Member>> {
        let state = self.state.lock().await;
        let mut members = state.members.get(queue_id).cloned().unwrap_or_default();
        members.sort_by_key(|m| m.token_number);
        Ok(members)
    }

    async fn list_active_queues(&self) -> Result<Vec<Queue>> {
        let state = self.state.lock().await;
        let mut queues: Vec<Queue> = state
            .queues
            .values()
            .filter(|q| q.is_active())
            .cloned()
            .collect();
        queues.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(queues)
    }

    async fn skip_member(&self, queue_id: &QueueId, member_id: &MemberId) -> Result<Member> {
        self.shared.check_writable()?;
        let now = self.shared.time_provider.now_millis();

        let mut state = self.state.lock().await;
        let member = state
            .member_mut(queue_id, member_id)
            .ok_or_else(|| AppError::member_not_found(queue_id, member_id))?;
        member
            .skip(now)
            .map_err(|e| AppError::InvalidState(e.to_string()))?;
        let skipped = member.clone();
        drop(state);

        self.shared.publish(StoreChange::Member {
            queue_id: queue_id.clone(),
            member_id: member_id.clone(),
        });
        Ok(skipped)
    }

    async fn set_queue_status(&self, queue_id: &QueueId, status: QueueStatus) -> Result<Queue> {
        self.shared.check_writable()?;

        let mut state = self.state.lock().await;
        let queue = state
            .queues
            .get_mut(queue_id)
            .ok_or_else(|| AppError::queue_not_found(queue_id))?;
        queue.status = status;
        let updated = queue.clone();
        drop(state);

        self.shared.publish(StoreChange::Queue {
            queue_id: queue_id.clone(),
        });
        Ok(updated)
    }

    fn changes(&self) -> broadcast::Receiver<StoreChange> {
        self.shared.changes.subscribe()
    }
}

#[async_trait]
impl TransactionalQueueStore for InMemoryQueueStore {
    async fn begin_transaction(&self) -> Result<Box<dyn QueueStoreTransaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction {
            guard,
            working,
            pending: Vec::new(),
            shared: self.shared.clone(),
        }))
    }
}

pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<State>,
    working: State,
    pending: Vec<StoreChange>,
    shared: Shared,
}

impl InMemoryTransaction {
    fn stage(&mut self, change: StoreChange) {
        if !self.pending.contains(&change) {
            self.pending.push(change);
        }
    }
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTransaction {
            mut guard,
            working,
            pending,
            shared,
        } = *self;
        if shared.fail_commits.load(Ordering::SeqCst) {
            return Err(AppError::Database("commit rejected by store".to_string()));
        }
        *guard = working;
        drop(guard);

        for change in pending {
            shared.publish(change);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        // Working copy is discarded with the guard
        if self.shared.fail_rollbacks.load(Ordering::SeqCst) {
            return Err(AppError::Database("rollback rejected by store".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl QueueStoreTransaction for InMemoryTransaction {
    async fn claim_next_token(&mut self, queue_id: &QueueId) -> Result<Option<TokenClaim>> {
        self.shared.check_writable()?;
        let Some(queue) = self.working.queues.get_mut(queue_id) else {
            return Ok(None);
        };
        let token_number = queue.next_token;
        queue.next_token += 1;
        let queue = queue.clone();

        self.stage(StoreChange::Queue {
            queue_id: queue_id.clone(),
        });
        Ok(Some(TokenClaim {
            token_number,
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
        self.shared.check_writable()?;
        if !self.working.queues.contains_key(queue_id) {
            return Err(AppError::queue_not_found(queue_id));
        }

        let members = self.working.members.entry(queue_id.clone()).or_default();
        if members.iter().any(|m| m.token_number == token_number) {
            return Err(AppError::Database(format!(
                "Unique constraint violation: token {} already issued in queue {}",
                token_number, queue_id
            )));
        }

        let member = Member::new(
            self.shared.id_provider.generate_id(),
            queue_id.clone(),
            name,
            quantity,
            token_number,
            self.shared.time_provider.now_millis(),
        );
        members.push(member.clone());

        self.stage(StoreChange::Member {
            queue_id: queue_id.clone(),
            member_id: member.id.clone(),
        });
        Ok(member)
    }

    async fn mark_served(&mut self, queue_id: &QueueId, member_id: &MemberId) -> Result<Member> {
        self.shared.check_writable()?;
        let now = self.shared.time_provider.now_millis();

        let member = self
            .working
            .member_mut(queue_id, member_id)
            .ok_or_else(|| AppError::member_not_found(queue_id, member_id))?;
        member
            .serve(now)
            .map_err(|e| AppError::InvalidState(e.to_string()))?;
        let served = member.clone();

        self.stage(StoreChange::Member {
            queue_id: queue_id.clone(),
            member_id: member_id.clone(),
        });
        Ok(served)
    }

    async fn find_queue(&mut self, queue_id: &QueueId) -> Result<Option<Queue>> {
        Ok(self.working.queues.get(queue_id).cloned())
    }

    async fn record_serve(
        &mut self,
        queue_id: &QueueId,
        token_number: i64,
        average_serve_time: i64,
    ) -> Result<Queue> {
        self.shared.check_writable()?;
        let queue = self
            .working
            .queues
            .get_mut(queue_id)
            .ok_or_else(|| AppError::queue_not_found(queue_id))?;
        queue.current_token = token_number;
        queue.average_serve_time = average_serve_time;
        queue.total_served += 1;
        let updated = queue.clone();

        self.stage(StoreChange::Queue {
            queue_id: queue_id.clone(),
        });
        Ok(updated)
    }
}
