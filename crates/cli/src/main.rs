//! Queueline CLI - organizer and customer commands against the daemon

mod rpc;
mod view;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use queueline_core::domain::{format_wait_time, parse_quantity, Member, Queue, TicketProgress};
use rpc::RpcClient;
use serde::Deserialize;
use serde_json::json;
use tabled::Table;
use view::{status_label, token_label, MemberLine, QueueLine};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9630";

#[derive(Parser)]
#[command(name = "queueline")]
#[command(about = "Queueline virtual queue CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "QUEUELINE_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a queue and print its share link
    Create {
        /// Display name
        name: String,
    },

    /// Join a queue and take a token
    Join {
        queue_id: String,

        /// Name to call out
        name: String,

        /// Party size
        #[arg(short, long, default_value = "1")]
        quantity: String,
    },

    /// Mark a member as served
    Serve { queue_id: String, member_id: String },

    /// Skip a member
    Skip { queue_id: String, member_id: String },

    /// Close a queue to new joins
    Close { queue_id: String },

    /// List the members of a queue
    Members { queue_id: String },

    /// List active queues
    List,

    /// Show position and estimated wait for a ticket
    Ticket { queue_id: String, member_id: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Created {
    queue_id: String,
    join_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Joined {
    member_id: String,
    token_number: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Served {
    token_number: i64,
    serve_time_secs: Option<i64>,
    average_serve_time: i64,
    total_served: i64,
}

#[derive(Deserialize)]
struct Skipped {
    member: Member,
}

#[derive(Deserialize)]
struct QueueResult {
    queue: Queue,
}

#[derive(Deserialize)]
struct MembersResult {
    members: Vec<Member>,
}

#[derive(Deserialize)]
struct QueuesResult {
    queues: Vec<Queue>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TicketResult {
    #[serde(flatten)]
    progress: TicketProgress,
    estimated_wait: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = RpcClient::new(cli.rpc_url);

    match cli.command {
        Commands::Create { name } => {
            let created: Created = client
                .call("queue.create.v1", json!({ "name": name }))
                .await?;

            println!("{}", "✓ Queue created".green().bold());
            println!();
            println!("  {} {}", "Queue ID:".bold(), created.queue_id);
            println!("  {} {}", "Join link:".bold(), created.join_url.cyan());
        }

        Commands::Join {
            queue_id,
            name,
            quantity,
        } => {
            let quantity = parse_quantity(&quantity).context("Party size must be at least 1")?;
            let joined: Joined = client
                .call(
                    "queue.join.v1",
                    json!({ "queueId": queue_id, "name": name, "quantity": quantity }),
                )
                .await?;

            println!(
                "{} {}",
                "✓ Joined. Your token:".green().bold(),
                token_label(joined.token_number).bold()
            );
            println!("  {} {}", "Member ID:".bold(), joined.member_id);
        }

        Commands::Serve {
            queue_id,
            member_id,
        } => {
            let served: Served = client
                .call(
                    "queue.serve.v1",
                    json!({ "queueId": queue_id, "memberId": member_id }),
                )
                .await?;

            println!(
                "{}",
                format!("✓ Token {} served", token_label(served.token_number))
                    .green()
                    .bold()
            );
            if let Some(secs) = served.serve_time_secs {
                println!("  {} {}", "Waited:".bold(), format_wait_time(secs));
            }
            println!(
                "  {} {}",
                "Average serve time:".bold(),
                format_wait_time(served.average_serve_time)
            );
            println!("  {} {}", "Total served:".bold(), served.total_served);
        }

        Commands::Skip {
            queue_id,
            member_id,
        } => {
            let skipped: Skipped = client
                .call(
                    "queue.skip.v1",
                    json!({ "queueId": queue_id, "memberId": member_id }),
                )
                .await?;

            println!(
                "{}",
                format!(
                    "✓ Token {} ({}) skipped",
                    token_label(skipped.member.token_number),
                    skipped.member.name
                )
                .yellow()
                .bold()
            );
        }

        Commands::Close { queue_id } => {
            let closed: QueueResult = client
                .call("queue.close.v1", json!({ "queueId": queue_id }))
                .await?;

            println!(
                "{}",
                format!("✓ Queue {} closed", closed.queue.name).green().bold()
            );
        }

        Commands::Members { queue_id } => {
            let queue: QueueResult = client
                .call("queue.get.v1", json!({ "queueId": queue_id }))
                .await?;
            let result: MembersResult = client
                .call("queue.members.v1", json!({ "queueId": queue_id }))
                .await?;

            println!("{}", queue.queue.name.cyan().bold());
            println!();
            if result.members.is_empty() {
                println!("{}", "No one has joined yet".yellow());
            } else {
                let lines: Vec<MemberLine> =
                    result.members.into_iter().map(MemberLine::from).collect();
                println!("{}", Table::new(lines));
            }
        }

        Commands::List => {
            let result: QueuesResult = client.call("queue.list.v1", json!({})).await?;

            if result.queues.is_empty() {
                println!("{}", "No active queues".yellow());
            } else {
                let lines: Vec<QueueLine> =
                    result.queues.into_iter().map(QueueLine::from).collect();
                println!("{}", Table::new(lines));
            }
        }

        Commands::Ticket {
            queue_id,
            member_id,
        } => {
            let ticket: TicketResult = client
                .call(
                    "ticket.status.v1",
                    json!({ "queueId": queue_id, "memberId": member_id }),
                )
                .await?;
            let progress = ticket.progress;

            println!(
                "{} {}",
                "Token".cyan().bold(),
                token_label(progress.member.token_number).bold()
            );
            println!("  {} {}", "Status:".bold(), status_label(progress.member.status));
            if progress.member.is_waiting() {
                println!("  {} {}", "Position:".bold(), progress.position);
                println!("  {} {}", "Estimated wait:".bold(), ticket.estimated_wait);
            }
            match progress.now_serving {
                Some(token) => println!("  {} {}", "Now serving:".bold(), token_label(token)),
                None => println!("  {} -", "Now serving:".bold()),
            }
        }
    }

    Ok(())
}
