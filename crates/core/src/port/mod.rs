// Port Layer - Interfaces for external dependencies

pub mod cancel;
pub mod change_feed;
pub mod id_provider; // For deterministic testing
pub mod memory_store;
pub mod queue_store;
pub mod time_provider;
pub mod transaction;

// Re-exports
pub use cancel::{cancel_channel, CancelHandle, CancelToken};
pub use change_feed::{ChangeFeed, Snapshot, SnapshotStream, WatchTarget};
pub use id_provider::IdProvider;
pub use memory_store::InMemoryQueueStore;
pub use queue_store::{QueueStore, StoreChange};
pub use time_provider::TimeProvider;
pub use transaction::{QueueStoreTransaction, TokenClaim, Transaction, TransactionalQueueStore};
