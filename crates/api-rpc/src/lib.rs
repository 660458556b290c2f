//! JSON-RPC API Layer
//!
//! Exposes the queue lifecycle operations and live subscriptions over
//! JSON-RPC 2.0 (HTTP and WebSocket on one port).

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig};
