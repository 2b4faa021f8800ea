use serde::de::DeserializeOwned;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{GridError, Result};
use crate::wire::{encode_frame, read_frame, write_encoded, Request, Response};

/// Persistent connection to an RPC endpoint.
///
/// Calls are serialized: one request is in flight at a time. A transport
/// failure or timeout leaves the stream in an unknown state, so the
/// connection is marked broken and every later call fails with
/// [`GridError::ConnectionClosed`].
pub struct RpcClient {
    peer_addr: SocketAddr,
    stream: Mutex<Option<TcpStream>>,
    next_seq: AtomicU64,
    call_timeout: Duration,
}

impl RpcClient {
    pub async fn connect(
        addr: &str,
        connect_timeout: Duration,
        call_timeout: Duration,
    ) -> Result<Self> {
        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| GridError::ConnectionFailed(format!("{}: timed out", addr)))?
            .map_err(|e| GridError::ConnectionFailed(format!("{}: {}", addr, e)))?;
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr()?;

        debug!("Connected to {}", peer_addr);

        Ok(Self {
            peer_addr,
            stream: Mutex::new(Some(stream)),
            next_seq: AtomicU64::new(1),
            call_timeout,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    pub async fn is_open(&self) -> bool {
        self.stream.lock().await.is_some()
    }

    /// Call `method` with `params` and decode the result.
    pub async fn call<P, R>(&self, method: &str, params: &P) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let params =
            serde_json::to_value(params).map_err(|e| GridError::SerializationError(e.to_string()))?;
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let request = Request {
            seq,
            method: method.to_string(),
            params,
        };
        // Encoding errors (oversized frames included) happen before any byte
        // is written and leave the connection usable.
        let frame = encode_frame(&request)?;

        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(GridError::ConnectionClosed)?;

        let outcome = match tokio::time::timeout(self.call_timeout, exchange(stream, seq, &frame)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(GridError::Timeout),
        };

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                if e.is_fatal() {
                    warn!("Connection to {} broken during {}: {}", self.peer_addr, method, e);
                    *guard = None;
                }
                return Err(e);
            }
        };
        drop(guard);

        let value = response.into_result()?;
        serde_json::from_value(value).map_err(|e| GridError::SerializationError(e.to_string()))
    }
}

async fn exchange(stream: &mut TcpStream, seq: u64, frame: &[u8]) -> Result<Response> {
    write_encoded(stream, frame).await?;

    let response: Response = read_frame(stream)
        .await?
        .ok_or(GridError::ConnectionClosed)?;

    if response.seq != seq {
        return Err(GridError::ProtocolError(format!(
            "expected response seq {}, got {}",
            seq, response.seq
        )));
    }

    Ok(response)
}
