// Domain Layer - Pure business logic and entities

pub mod error;
pub mod link;
pub mod member;
pub mod progress;
pub mod queue;

// Re-exports
pub use error::DomainError;
pub use link::join_url;
pub use member::{parse_quantity, Member, MemberId, MemberStatus};
pub use progress::{
    calculate_position, calculate_wait_time, current_serving, format_wait_time, TicketProgress,
};
pub use queue::{running_average, Queue, QueueId, QueueStatus, DEFAULT_AVERAGE_SERVE_TIME_SECS};
