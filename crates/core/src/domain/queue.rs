// Queue Domain Model

use serde::{Deserialize, Serialize};

/// Queue identifier
pub type QueueId = String;

/// Average serve time a fresh queue starts with (2 minutes)
pub const DEFAULT_AVERAGE_SERVE_TIME_SECS: i64 = 120;

/// Queue lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Active,
    Closed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Active => "active",
            QueueStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QueueStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(QueueStatus::Active),
            "closed" => Ok(QueueStatus::Closed),
            other => Err(format!("unknown queue status: {}", other)),
        }
    }
}

/// Queue Entity (one service line)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Queue {
    pub id: QueueId,
    pub name: String,
    pub created_at: i64, // epoch ms, assigned by the store

    /// Token of the member served most recently (0 before the first serve)
    pub current_token: i64,
    pub total_served: i64,
    /// Running mean of measured serve times, in seconds
    pub average_serve_time: i64,
    /// Token the next joining member receives
    pub next_token: i64,

    pub status: QueueStatus,
}

impl Queue {
    /// Create a new queue
    ///
    /// # Arguments
    ///
    /// * `id` - Queue ID (injected, not generated)
    /// * `name` - Display name, accepted as-is
    /// * `created_at` - Creation timestamp in epoch ms (store clock)
    pub fn new(id: impl Into<String>, name: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at,
            current_token: 0,
            total_served: 0,
            average_serve_time: DEFAULT_AVERAGE_SERVE_TIME_SECS,
            next_token: 1,
            status: QueueStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == QueueStatus::Active
    }

    /// Fold one serve into the aggregate statistics.
    ///
    /// Without a measured serve time the average is left untouched, but the
    /// counters still move.
    pub fn record_serve(&mut self, token_number: i64, serve_time_secs: Option<i64>) {
        if let Some(sample) = serve_time_secs {
            self.average_serve_time =
                running_average(self.average_serve_time, self.total_served, sample);
        }
        self.current_token = token_number;
        self.total_served += 1;
    }
}

/// Cumulative running mean, floored: `(avg * n + sample) / (n + 1)`
pub fn running_average(average: i64, total_served: i64, sample: i64) -> i64 {
    (average * total_served + sample).div_euclid(total_served + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_queue_defaults() {
        let queue = Queue::new("q1", "Bakery", 1_000);

        assert_eq!(queue.current_token, 0);
        assert_eq!(queue.total_served, 0);
        assert_eq!(queue.average_serve_time, 120);
        assert_eq!(queue.next_token, 1);
        assert_eq!(queue.status, QueueStatus::Active);
        assert!(queue.is_active());
    }

    #[test]
    fn test_running_average_sequence() {
        // 120s default, nobody served yet: the first sample replaces it
        assert_eq!(running_average(120, 0, 60), 60);
        assert_eq!(running_average(60, 1, 180), 120);
        // floor, not round
        assert_eq!(running_average(100, 2, 51), 83);
    }

    #[test]
    fn test_record_serve_without_sample_keeps_average() {
        let mut queue = Queue::new("q1", "Bakery", 0);
        queue.record_serve(4, None);

        assert_eq!(queue.average_serve_time, 120);
        assert_eq!(queue.current_token, 4);
        assert_eq!(queue.total_served, 1);
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_value(QueueStatus::Active).unwrap();
        assert_eq!(json, serde_json::json!("active"));
        assert_eq!("closed".parse::<QueueStatus>().unwrap(), QueueStatus::Closed);
        assert!("paused".parse::<QueueStatus>().is_err());
    }

    #[test]
    fn test_queue_fields_are_camel_case() {
        let json = serde_json::to_value(Queue::new("q1", "Bakery", 5)).unwrap();
        assert_eq!(json["averageServeTime"], 120);
        assert_eq!(json["currentToken"], 0);
        assert_eq!(json["createdAt"], 5);
    }
}
