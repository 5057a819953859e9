#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]
//! # Murmur Transport - message plumbing
//!
//! Everything below the gossip engine:
//! - Envelope and body types for line-delimited JSON messages
//! - The [`Transport`] trait (`send`, `reply`, `rpc`) and [`MessageHandler`]
//! - A [`Router`] that dispatches inbound requests by message type
//! - [`StdioRuntime`]: the production runtime over stdin/stdout
//! - [`MemoryNetwork`]: an in-process network for simulation and tests
//!
//! RPC responses are correlated through `msg_id`/`in_reply_to` and bounded by
//! a per-runtime timeout, so a lost response never leaves a waiter behind.

pub mod error;
pub mod memory;
pub mod message;
mod pending;
pub mod router;
pub mod stdio;
pub mod traits;

pub use error::{ErrorCode, HandlerError, TransportError, TransportResult};
pub use memory::{MemoryNetwork, MemoryTransport};
pub use message::{Body, InitPayload, Message, NodeId};
pub use router::Router;
pub use stdio::{StdioConfig, StdioRuntime, StdioTransport};
pub use traits::{MessageHandler, Transport};
