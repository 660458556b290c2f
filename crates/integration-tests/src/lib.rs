//! Shared fixtures for the cross-crate test suites

use queueline_core::application::{QueueService, StoreChangeFeed};
use queueline_core::port::id_provider::mocks::SequentialIdProvider;
use queueline_core::port::id_provider::UuidProvider;
use queueline_core::port::time_provider::mocks::ManualClock;
use queueline_core::port::IdProvider;
use queueline_infra_sqlite::{create_pool, run_migrations, SqliteQueueStore};
use std::path::Path;
use std::sync::Arc;

/// Service, store and clock wired over one SQLite database
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: Arc<SqliteQueueStore>,
    pub service: QueueService,
}

impl Harness {
    /// Fresh in-memory database; queue ids are `q-1`, `q-2`, ...
    pub async fn in_memory() -> Self {
        Self::open("sqlite::memory:", Arc::new(SequentialIdProvider::new("q"))).await
    }

    /// Database file under `dir`, created on first open
    pub async fn at_path(path: &Path, queue_ids: Arc<dyn IdProvider>) -> Self {
        let url = format!("sqlite://{}", path.display());
        Self::open(&url, queue_ids).await
    }

    async fn open(url: &str, queue_ids: Arc<dyn IdProvider>) -> Self {
        let pool = create_pool(url).await.expect("pool");
        run_migrations(&pool).await.expect("migrations");

        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let store = Arc::new(SqliteQueueStore::new(
            pool,
            clock.clone(),
            Arc::new(UuidProvider),
        ));
        let service = QueueService::new(store.clone(), queue_ids);

        Self {
            clock,
            store,
            service,
        }
    }

    pub fn feed(&self) -> Arc<StoreChangeFeed> {
        Arc::new(StoreChangeFeed::new(self.store.clone()))
    }
}
