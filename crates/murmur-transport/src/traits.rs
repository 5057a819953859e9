//! Transport and handler traits.
//!
//! The gossip layer only ever talks to these traits. Concrete runtimes
//! (stdio, in-memory) live next to them in this crate.

use crate::error::{HandlerError, TransportResult};
use crate::message::{Body, Message, NodeId};
use async_trait::async_trait;

/// Message delivery primitives offered to the layers above
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Identifier of the local node
    fn node_id(&self) -> &NodeId;

    /// Fire-and-forget delivery of `body` to `to`
    async fn send(&self, to: &NodeId, body: Body) -> TransportResult<()>;

    /// Answer `request`, setting `in_reply_to` from its `msg_id`
    async fn reply(&self, request: &Message, body: Body) -> TransportResult<()>;

    /// Send `body` as a request and wait for the correlated response.
    ///
    /// An `error` response resolves to [`TransportError::Remote`](crate::TransportError::Remote).
    async fn rpc(&self, to: &NodeId, body: Body) -> TransportResult<Message>;
}

/// Handler for inbound requests of one or more message types
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Process `message`, replying through the transport as needed
    async fn handle(&self, message: Message) -> Result<(), HandlerError>;
}
