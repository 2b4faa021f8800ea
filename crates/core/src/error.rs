use thiserror::Error;

/// Errors raised while building or validating the shared dispatch types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Skill descriptor is missing a field required for registration
    #[error("Invalid skill descriptor: {0}")]
    InvalidDescriptor(String),

    /// The RPC port (base port + 1) does not fit in a u16
    #[error("Port {0} leaves no room for the RPC port")]
    PortOverflow(u16),
}

/// Convenience Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
