// Application Layer - Use Cases and Business Logic

pub mod queue_service;
pub mod watch;

// Re-exports
pub use queue_service::QueueService;
pub use watch::{
    watch_active_queues, watch_member, watch_members, watch_queue, StoreChangeFeed, WatchHandle,
};
