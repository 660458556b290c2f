// Derived queue state: position, wait estimate, serving token
//
// Pure functions over a member snapshot. No I/O.

use crate::domain::member::Member;
use serde::{Deserialize, Serialize};

/// 1-indexed position of `token_number` among waiting members.
///
/// Only waiting members with a lower token count; served and skipped members
/// never do, whatever their token.
pub fn calculate_position(members: &[Member], token_number: i64) -> usize {
    members
        .iter()
        .filter(|m| m.is_waiting() && m.token_number < token_number)
        .count()
        + 1
}

/// Estimated wait in seconds: `(position - 1) * average_serve_time`.
///
/// Party size is not taken into account.
pub fn calculate_wait_time(members: &[Member], token_number: i64, average_serve_time: i64) -> i64 {
    let ahead = calculate_position(members, token_number) as i64 - 1;
    ahead * average_serve_time
}

/// The member being served now: the waiting member with the lowest token.
///
/// The queue's stored `current_token` (last served) plays no part here.
pub fn current_serving(members: &[Member]) -> Option<&Member> {
    members
        .iter()
        .filter(|m| m.is_waiting())
        .min_by_key(|m| m.token_number)
}

/// Human readable wait: "45 seconds", "1 minute", "7 minutes"
pub fn format_wait_time(seconds: i64) -> String {
    if seconds < 60 {
        return format!("{} seconds", seconds);
    }
    let minutes = seconds / 60;
    if minutes > 1 {
        format!("{} minutes", minutes)
    } else {
        format!("{} minute", minutes)
    }
}

/// What a customer sees for their ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketProgress {
    pub member: Member,
    pub position: usize,
    pub estimated_wait_secs: i64,
    pub now_serving: Option<i64>,
}

impl TicketProgress {
    /// Build the view for `member` from the full member list of its queue
    pub fn compute(member: Member, members: &[Member], average_serve_time: i64) -> Self {
        let position = calculate_position(members, member.token_number);
        let estimated_wait_secs =
            calculate_wait_time(members, member.token_number, average_serve_time);
        let now_serving = current_serving(members).map(|m| m.token_number);

        Self {
            member,
            position,
            estimated_wait_secs,
            now_serving,
        }
    }
}
