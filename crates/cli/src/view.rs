//! Table rows and formatting for terminal output

use colored::{ColoredString, Colorize};
use queueline_core::domain::{format_wait_time, Member, MemberStatus, Queue};
use tabled::Tabled;

#[derive(Tabled)]
pub struct MemberLine {
    #[tabled(rename = "Token")]
    pub token: i64,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Party")]
    pub quantity: u32,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Member ID")]
    pub id: String,
}

impl From<Member> for MemberLine {
    fn from(member: Member) -> Self {
        Self {
            token: member.token_number,
            name: member.name,
            quantity: member.quantity,
            status: member.status.to_string(),
            id: member.id,
        }
    }
}

#[derive(Tabled)]
pub struct QueueLine {
    #[tabled(rename = "Queue ID")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Last Served")]
    pub current_token: i64,
    #[tabled(rename = "Served")]
    pub total_served: i64,
    #[tabled(rename = "Avg Serve")]
    pub average: String,
    #[tabled(rename = "Status")]
    pub status: String,
}

impl From<Queue> for QueueLine {
    fn from(queue: Queue) -> Self {
        Self {
            average: format_wait_time(queue.average_serve_time),
            status: queue.status.to_string(),
            id: queue.id,
            name: queue.name,
            current_token: queue.current_token,
            total_served: queue.total_served,
        }
    }
}

pub fn status_label(status: MemberStatus) -> ColoredString {
    match status {
        MemberStatus::Waiting => "waiting".yellow(),
        MemberStatus::Served => "served".green(),
        MemberStatus::Skipped => "skipped".red(),
    }
}

/// Zero-padded token the way it is announced: `#007`
pub fn token_label(token: i64) -> String {
    format!("#{:03}", token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_label() {
        assert_eq!(token_label(7), "#007");
        assert_eq!(token_label(1234), "#1234");
    }

    #[test]
    fn test_queue_line_formats_average() {
        let mut queue = Queue::new("q1", "Deli", 0);
        queue.average_serve_time = 45;
        let line = QueueLine::from(queue);
        assert_eq!(line.average, "45 seconds");
        assert_eq!(line.status, "active");
    }
}
