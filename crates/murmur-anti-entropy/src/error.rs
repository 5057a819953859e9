//! Gossip engine errors.

use murmur_transport::{HandlerError, TransportError};

pub type GossipResult<T> = Result<T, GossipError>;

/// Errors raised by the gossip engine
#[derive(Debug, thiserror::Error)]
pub enum GossipError {
    /// An inbound body did not match any known payload
    #[error("Failed to decode payload: {0}")]
    Decode(#[source] serde_json::Error),

    /// A payload could not be encoded into a body
    #[error("Failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),

    /// Sending or receiving through the transport failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A peer answered with a body of the wrong type
    #[error("Unexpected reply: expected {expected}, got {actual}")]
    UnexpectedReply {
        /// Type we were waiting for
        expected: &'static str,
        /// Type that arrived
        actual: String,
    },

    /// A request type this engine does not serve
    #[error("Unsupported request: {0}")]
    Unsupported(String),

    /// Invalid engine configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<GossipError> for HandlerError {
    fn from(err: GossipError) -> Self {
        match err {
            GossipError::Decode(e) => HandlerError::Malformed(e.to_string()),
            GossipError::Transport(e) => HandlerError::Transport(e),
            GossipError::Unsupported(kind) => HandlerError::Unsupported(kind),
            other => HandlerError::Malformed(other.to_string()),
        }
    }
}
