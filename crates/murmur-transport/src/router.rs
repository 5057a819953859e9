//! Dispatch of inbound messages to handlers keyed by message type.

use crate::error::HandlerError;
use crate::message::{Body, Message};
use crate::traits::{MessageHandler, Transport};
use std::collections::HashMap;
use std::sync::Arc;

/// Routing table from message type to handler
#[derive(Clone, Default)]
pub struct Router {
    routes: HashMap<String, Arc<dyn MessageHandler>>,
}

impl Router {
    /// Empty routing table
    pub fn new() -> Self {
        Self::default()
    }

    /// Route messages of type `kind` to `handler`, replacing any earlier route
    pub fn route(
        &mut self,
        kind: impl Into<String>,
        handler: Arc<dyn MessageHandler>,
    ) -> &mut Self {
        self.routes.insert(kind.into(), handler);
        self
    }

    /// Whether a handler is registered for `kind`
    pub fn handles(&self, kind: &str) -> bool {
        self.routes.contains_key(kind)
    }

    /// Registered message types, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Hand `message` to its handler
    pub async fn dispatch(&self, message: Message) -> Result<(), HandlerError> {
        match self.routes.get(message.kind()) {
            Some(handler) => handler.handle(message).await,
            None => Err(HandlerError::Unsupported(message.kind().to_string())),
        }
    }

    /// Dispatch `message` and report a failure back to its sender.
    ///
    /// Requests (messages with a `msg_id`) get an `error` reply; anything
    /// else is only logged since there is nobody waiting for an answer.
    pub async fn handle_inbound<T>(&self, transport: &T, message: Message)
    where
        T: Transport + ?Sized,
    {
        let src = message.src.clone();
        let kind = message.kind().to_string();
        let msg_id = message.body.msg_id;
        let request = message.clone();

        let Err(err) = self.dispatch(message).await else {
            return;
        };

        tracing::warn!(src = %src, kind = %kind, error = %err, "Handler failed");

        if msg_id.is_none() {
            return;
        }
        let body = Body::error(err.code(), err.to_string());
        if let Err(e) = transport.reply(&request, body).await {
            tracing::warn!(src = %src, error = %e, "Failed to deliver error reply");
        }
    }
}
