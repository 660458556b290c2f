// Queueline Infrastructure - SQLite Adapter
// Implements: QueueStore, TransactionalQueueStore

mod connection;
mod error;
mod migration;
mod queue_store;
mod rows;
mod transaction;

pub use connection::create_pool;
pub use migration::run_migrations;
pub use queue_store::SqliteQueueStore;
pub use transaction::SqliteQueueTransaction;

// Note: sqlx::Error conversion is handled by map_sqlx_error
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
