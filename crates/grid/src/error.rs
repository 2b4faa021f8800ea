use thiserror::Error;

/// Errors that can occur on an RPC connection.
///
/// These cover connecting to a remote endpoint, framing and decoding
/// messages, and failures reported by the remote side itself.
#[derive(Error, Debug)]
pub enum GridError {
    /// Failed to establish connection to the remote endpoint
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Wire protocol violation or unexpected message
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// Failed to serialize or deserialize a frame
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Frame length prefix exceeds the allowed maximum
    #[error("frame of {0} bytes exceeds maximum message size")]
    FrameTooLarge(usize),

    /// Remote side answered with an error
    #[error("remote error: {0}")]
    Remote(String),

    /// Operation timed out waiting for response
    #[error("timeout")]
    Timeout,

    /// Connection was closed or marked broken by an earlier failure
    #[error("connection closed")]
    ConnectionClosed,

    /// I/O operation failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GridError {
    /// Whether the connection that produced this error can no longer be used.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, GridError::Remote(_) | GridError::SerializationError(_))
    }
}

/// Convenience Result type for Grid operations
pub type Result<T> = std::result::Result<T, GridError>;
