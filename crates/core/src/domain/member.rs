// Member Domain Model (one ticket within a queue)

use crate::domain::error::{DomainError, Result};
use crate::domain::queue::QueueId;
use serde::{Deserialize, Serialize};

/// Member ID (assigned by the store)
pub type MemberId = String;

/// Member Status
///
/// `Served` and `Skipped` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Waiting,
    Served,
    Skipped,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Waiting => "waiting",
            MemberStatus::Served => "served",
            MemberStatus::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemberStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(MemberStatus::Waiting),
            "served" => Ok(MemberStatus::Served),
            "skipped" => Ok(MemberStatus::Skipped),
            other => Err(format!("unknown member status: {}", other)),
        }
    }
}

/// Member Entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    pub queue_id: QueueId,
    pub name: String,
    pub quantity: u32,
    pub token_number: i64,
    pub status: MemberStatus,

    pub joined_at: Option<i64>, // epoch ms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub served_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped_at: Option<i64>,
}

impl Member {
    /// Create a waiting member
    pub fn new(
        id: impl Into<String>,
        queue_id: impl Into<String>,
        name: impl Into<String>,
        quantity: u32,
        token_number: i64,
        joined_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            queue_id: queue_id.into(),
            name: name.into(),
            quantity,
            token_number,
            status: MemberStatus::Waiting,
            joined_at: Some(joined_at),
            served_at: None,
            skipped_at: None,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.status == MemberStatus::Waiting
    }

    /// Transition to Served state with explicit timestamp
    pub fn serve(&mut self, now_millis: i64) -> Result<()> {
        self.ensure_waiting(MemberStatus::Served)?;
        self.status = MemberStatus::Served;
        self.served_at = Some(now_millis);
        Ok(())
    }

    /// Transition to Skipped state with explicit timestamp
    pub fn skip(&mut self, now_millis: i64) -> Result<()> {
        self.ensure_waiting(MemberStatus::Skipped)?;
        self.status = MemberStatus::Skipped;
        self.skipped_at = Some(now_millis);
        Ok(())
    }

    /// Whole seconds between joining and being served, if both are known
    pub fn serve_time_secs(&self) -> Option<i64> {
        let joined = self.joined_at?;
        let served = self.served_at?;
        Some((served - joined).div_euclid(1000))
    }

    fn ensure_waiting(&self, to: MemberStatus) -> Result<()> {
        if self.status != MemberStatus::Waiting {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }
}

/// Coerce a party size typed by a customer.
///
/// Takes the leading integer the way a lenient form field would ("3 people"
/// is 3) and rejects anything below 1.
pub fn parse_quantity(input: &str) -> Result<u32> {
    let trimmed = input.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    let value: u32 = digits[..end]
        .parse()
        .map_err(|_| DomainError::InvalidQuantity(input.to_string()))?;

    if negative || value == 0 {
        return Err(DomainError::InvalidQuantity(input.to_string()));
    }
    Ok(value)
}
