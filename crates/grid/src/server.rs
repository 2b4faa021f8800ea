//! RPC listener - serves framed requests through an [`RpcHandler`]

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::{GridError, Result};
use crate::wire::{encode_frame, read_frame, write_encoded, Request, Response};

/// Handles one decoded request. An `Err` is sent back as a remote error.
#[async_trait]
pub trait RpcHandler: Send + Sync + 'static {
    async fn handle(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, String>;
}

pub struct RpcServer {
    listener: TcpListener,
}

impl RpcServer {
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the accept loop in the background. Each connection gets its own
    /// task and may carry any number of sequential requests.
    pub fn spawn<H: RpcHandler>(self, handler: Arc<H>) -> JoinHandle<()> {
        let listener = self.listener;

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer_addr)) => {
                        debug!("RPC connection from {}", peer_addr);
                        let handler = Arc::clone(&handler);

                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, handler).await {
                                warn!("Connection error from {}: {}", peer_addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                }
            }
        })
    }
}

async fn handle_connection<H: RpcHandler>(mut stream: TcpStream, handler: Arc<H>) -> Result<()> {
    stream.set_nodelay(true)?;

    while let Some(request) = read_frame::<_, Request>(&mut stream).await? {
        debug!("Handling {} (seq {})", request.method, request.seq);

        let response = match handler.handle(&request.method, request.params).await {
            Ok(result) => Response::success(request.seq, result),
            Err(e) => Response::failure(request.seq, &e),
        };

        let frame = match encode_frame(&response) {
            Ok(frame) => frame,
            Err(e @ GridError::FrameTooLarge(_)) => {
                warn!("Reply to {} not sent: {}", request.method, e);
                encode_frame(&Response::failure(request.seq, &e.to_string()))?
            }
            Err(e) => return Err(e),
        };
        write_encoded(&mut stream, &frame).await?;
    }

    Ok(())
}
