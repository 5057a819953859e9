//! Transport errors
//!
//! Three layers of failure live here:
//! - [`TransportError`]: the transport itself could not move a message
//! - [`ErrorCode`]: the numeric codes carried by `error` bodies on the wire
//! - [`HandlerError`]: a message handler refused or failed a request

use crate::message::NodeId;
use serde::{Deserialize, Serialize};

/// Result alias for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors raised while sending, receiving or correlating messages
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Reading or writing the underlying stream failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A message could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The transport was shut down while an operation was in flight
    #[error("Transport closed")]
    Closed,

    /// The destination is not attached to this network
    #[error("Unknown peer: {0}")]
    UnknownPeer(NodeId),

    /// No response arrived for an RPC within the configured timeout
    #[error("RPC to {peer} timed out after {timeout_ms}ms")]
    Timeout {
        /// Destination of the RPC
        peer: NodeId,
        /// Timeout that elapsed
        timeout_ms: u64,
    },

    /// The `init` handshake did not complete
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// The remote answered an RPC with an `error` body
    #[error("Remote error {code}: {text}")]
    Remote {
        /// Protocol error code
        code: u32,
        /// Human readable description
        text: String,
    },
}

/// Error codes understood by every node in the cluster protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum ErrorCode {
    /// The request timed out
    Timeout,
    /// The destination node does not exist
    NodeNotFound,
    /// The message type is not supported by this node
    NotSupported,
    /// The node cannot serve the request right now
    TemporarilyUnavailable,
    /// The request body was malformed
    MalformedRequest,
    /// The handler crashed while processing the request
    Crash,
    /// The request was aborted
    Abort,
}

impl ErrorCode {
    /// Numeric wire value
    pub fn code(self) -> u32 {
        match self {
            ErrorCode::Timeout => 0,
            ErrorCode::NodeNotFound => 1,
            ErrorCode::NotSupported => 10,
            ErrorCode::TemporarilyUnavailable => 11,
            ErrorCode::MalformedRequest => 12,
            ErrorCode::Crash => 13,
            ErrorCode::Abort => 14,
        }
    }
}

impl From<ErrorCode> for u32 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl TryFrom<u32> for ErrorCode {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Timeout),
            1 => Ok(ErrorCode::NodeNotFound),
            10 => Ok(ErrorCode::NotSupported),
            11 => Ok(ErrorCode::TemporarilyUnavailable),
            12 => Ok(ErrorCode::MalformedRequest),
            13 => Ok(ErrorCode::Crash),
            14 => Ok(ErrorCode::Abort),
            other => Err(format!("unknown error code {other}")),
        }
    }
}

/// Failure reported by a [`MessageHandler`](crate::MessageHandler)
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The request could not be decoded into a known payload
    #[error("Malformed request: {0}")]
    Malformed(String),

    /// No handler understands this message type
    #[error("Unsupported message type: {0}")]
    Unsupported(String),

    /// Replying or forwarding failed
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl HandlerError {
    /// Wire code sent back to the requester
    pub fn code(&self) -> ErrorCode {
        match self {
            HandlerError::Malformed(_) => ErrorCode::MalformedRequest,
            HandlerError::Unsupported(_) => ErrorCode::NotSupported,
            HandlerError::Transport(TransportError::Timeout { .. }) => ErrorCode::Timeout,
            HandlerError::Transport(TransportError::UnknownPeer(_)) => ErrorCode::NodeNotFound,
            HandlerError::Transport(_) => ErrorCode::Crash,
        }
    }
}
