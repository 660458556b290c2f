// ID Provider Port (for deterministic testing)

use crate::port::TimeProvider;
use rand::Rng;
use std::sync::Arc;

/// ID provider interface (allows deterministic IDs in tests)
pub trait IdProvider: Send + Sync {
    /// Generate a new unique ID
    fn generate_id(&self) -> String;
}

/// UUID v4 provider (member ids assigned by the stores)
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn generate_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Queue id provider: base-36 epoch millis followed by a base-36 random suffix.
///
/// Short enough to put in a link or QR code. Uniqueness is probabilistic only.
pub struct TimestampIdProvider {
    time_provider: Arc<dyn TimeProvider>,
}

impl TimestampIdProvider {
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self { time_provider }
    }
}

impl IdProvider for TimestampIdProvider {
    fn generate_id(&self) -> String {
        let millis = self.time_provider.now_millis().max(0) as u64;
        let suffix: u64 = rand::thread_rng().gen();
        format!("{}{}", to_base36(millis), to_base36(suffix))
    }
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::with_capacity(13);
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Deterministic ids: `<prefix>-1`, `<prefix>-2`, ...
    pub struct SequentialIdProvider {
        prefix: String,
        counter: AtomicU64,
    }

    impl SequentialIdProvider {
        pub fn new(prefix: impl Into<String>) -> Self {
            Self {
                prefix: prefix.into(),
                counter: AtomicU64::new(1),
            }
        }
    }

    impl IdProvider for SequentialIdProvider {
        fn generate_id(&self) -> String {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            format!("{}-{}", self.prefix, n)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::SequentialIdProvider;
    use super::*;
    use crate::port::time_provider::mocks::ManualClock;

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_700_000_000_000), "loyw3v28");
    }

    #[test]
    fn test_timestamp_ids_start_with_time_prefix() {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let provider = TimestampIdProvider::new(clock);

        let a = provider.generate_id();
        let b = provider.generate_id();
        assert!(a.starts_with("loyw3v28"));
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_sequential_ids() {
        let provider = SequentialIdProvider::new("queue");
        assert_eq!(provider.generate_id(), "queue-1");
        assert_eq!(provider.generate_id(), "queue-2");
    }
}
