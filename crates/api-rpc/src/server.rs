//! JSON-RPC Server
//!
//! One TCP listener serves plain HTTP calls and WebSocket subscriptions.

use crate::handler::{RpcHandler, Watch};
use crate::types::{
    CreateQueueRequest, JoinQueueRequest, ListQueuesRequest, MemberRequest, MembersChanged,
    QueueChanged, QueueRequest,
};
use jsonrpsee::core::SubscriptionResult;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::{PendingSubscriptionSink, RpcModule, SubscriptionMessage};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9630;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    /// 0 picks a free port
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, handler: RpcHandler) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
        }
    }

    /// Start the JSON-RPC server, returning the bound address and its handle
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC server"
        );

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        let module = self.into_module()?;

        info!(addr = %local_addr, "JSON-RPC server started successfully");

        let handle = server.start(module);
        Ok((local_addr, handle))
    }

    fn into_module(self) -> Result<RpcModule<()>, String> {
        let mut module = RpcModule::new(());

        // Register methods
        let handler = self.handler.clone();
        module
            .register_async_method("queue.create.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: CreateQueueRequest = params.parse()?;
                    handler.create_queue(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.join.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: JoinQueueRequest = params.parse()?;
                    handler.join_queue(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.serve.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: MemberRequest = params.parse()?;
                    handler.serve(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.skip.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: MemberRequest = params.parse()?;
                    handler.skip(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.close.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: QueueRequest = params.parse()?;
                    handler.close(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.get.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: QueueRequest = params.parse()?;
                    handler.get_queue(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.members.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: QueueRequest = params.parse()?;
                    handler.members(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.list.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    // Accept a missing params field as well as `{}`
                    let req: ListQueuesRequest = if params.is_object() {
                        params.parse()?
                    } else {
                        ListQueuesRequest {}
                    };
                    handler.list_queues(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("ticket.status.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: MemberRequest = params.parse()?;
                    handler.ticket_status(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        // Subscriptions
        let handler = self.handler.clone();
        module
            .register_subscription(
                "queue.watch.v1",
                "queue.changed",
                "queue.unwatch.v1",
                move |params, pending, _, _| {
                    let handler = handler.clone();
                    async move {
                        let req: QueueRequest = match params.parse() {
                            Ok(req) => req,
                            Err(e) => {
                                pending.reject(e).await;
                                return Ok(());
                            }
                        };
                        match handler.watch_queue(&req.queue_id).await {
                            Ok(watch) => {
                                pipe(pending, watch, |queue| QueueChanged { queue }).await
                            }
                            Err(e) => {
                                pending.reject(e).await;
                                Ok(())
                            }
                        }
                    }
                },
            )
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_subscription(
                "members.watch.v1",
                "members.changed",
                "members.unwatch.v1",
                move |params, pending, _, _| {
                    let handler = handler.clone();
                    async move {
                        let req: QueueRequest = match params.parse() {
                            Ok(req) => req,
                            Err(e) => {
                                pending.reject(e).await;
                                return Ok(());
                            }
                        };
                        match handler.watch_members(&req.queue_id).await {
                            Ok(watch) => {
                                pipe(pending, watch, |members| MembersChanged { members }).await
                            }
                            Err(e) => {
                                pending.reject(e).await;
                                Ok(())
                            }
                        }
                    }
                },
            )
            .map_err(|e| e.to_string())?;

        Ok(module)
    }
}

/// Forward watch updates to a subscriber until either side goes away
async fn pipe<T, P, F>(
    pending: PendingSubscriptionSink,
    watch: Watch<T>,
    wrap: F,
) -> SubscriptionResult
where
    P: Serialize,
    F: Fn(T) -> P,
{
    let Watch {
        handle,
        mut updates,
    } = watch;
    let sink = pending.accept().await?;
    debug!("Subscription accepted");

    loop {
        tokio::select! {
            _ = sink.closed() => break,
            update = updates.recv() => {
                let Some(update) = update else { break };
                let message = SubscriptionMessage::from_json(&wrap(update))?;
                if sink.send(message).await.is_err() {
                    break;
                }
            }
        }
    }

    debug!("Subscription ended");
    handle.cancel();
    Ok(())
}
