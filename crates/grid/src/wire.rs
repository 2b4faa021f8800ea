//! Frame codec shared by the control port and skill RPC ports.
//!
//! A frame is a 4-byte big-endian length followed by a JSON document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{GridError, Result};

pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024; // 16 MB

/// A call to a named remote procedure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub seq: u64,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Answer to a [`Request`] with the same `seq`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub seq: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn success(seq: u64, result: serde_json::Value) -> Self {
        Self {
            seq,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(seq: u64, error: &str) -> Self {
        Self {
            seq,
            result: None,
            error: Some(error.to_string()),
        }
    }

    /// Remote errors become [`GridError::Remote`]; a missing result is `null`.
    pub fn into_result(self) -> Result<serde_json::Value> {
        match self.error {
            Some(e) => Err(GridError::Remote(e)),
            None => Ok(self.result.unwrap_or(serde_json::Value::Null)),
        }
    }
}

/// Encode `message` as a complete frame, length prefix included.
pub fn encode_frame<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    let body =
        serde_json::to_vec(message).map_err(|e| GridError::SerializationError(e.to_string()))?;
    if body.len() > MAX_MESSAGE_SIZE {
        return Err(GridError::FrameTooLarge(body.len()));
    }

    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode_frame(message)?;
    write_encoded(writer, &frame).await
}

/// Write a frame produced by [`encode_frame`].
pub async fn write_encoded<W>(writer: &mut W, frame: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame. Returns `Ok(None)` on a clean EOF between frames; EOF
/// anywhere inside a frame, the length prefix included, is an IO error.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    if reader.read(&mut len_buf[..1]).await? == 0 {
        return Ok(None);
    }
    reader.read_exact(&mut len_buf[1..]).await?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(GridError::FrameTooLarge(len));
    }

    let mut msg_buf = vec![0u8; len];
    reader.read_exact(&mut msg_buf).await?;

    let message =
        serde_json::from_slice(&msg_buf).map_err(|e| GridError::SerializationError(e.to_string()))?;
    Ok(Some(message))
}
