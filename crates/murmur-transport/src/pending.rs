//! Outstanding RPC bookkeeping shared by every runtime.

use crate::error::{TransportError, TransportResult};
use crate::message::{Message, NodeId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;

/// Table of requests awaiting a response, keyed by `msg_id`
#[derive(Debug, Default)]
pub(crate) struct PendingRpcs {
    next_msg_id: AtomicU64,
    waiting: Mutex<HashMap<u64, oneshot::Sender<Message>>>,
}

impl PendingRpcs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh, strictly increasing message id (starting at 1)
    pub(crate) fn next_msg_id(&self) -> u64 {
        self.next_msg_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Register interest in the response to `msg_id`
    pub(crate) fn register(&self, msg_id: u64) -> oneshot::Receiver<Message> {
        let (tx, rx) = oneshot::channel();
        self.waiting.lock().insert(msg_id, tx);
        rx
    }

    /// Complete the RPC this message answers.
    ///
    /// Returns the message back when it is not a response to anything we are
    /// waiting for.
    pub(crate) fn resolve(&self, message: Message) -> Option<Message> {
        let Some(in_reply_to) = message.body.in_reply_to else {
            return Some(message);
        };
        let waiter = self.waiting.lock().remove(&in_reply_to);
        match waiter {
            Some(tx) => {
                // The caller may have given up already; nothing left to do then.
                let _ = tx.send(message);
                None
            }
            None => Some(message),
        }
    }

    /// Drop interest in `msg_id`
    pub(crate) fn forget(&self, msg_id: u64) {
        self.waiting.lock().remove(&msg_id);
    }

    /// Number of requests still waiting
    pub(crate) fn len(&self) -> usize {
        self.waiting.lock().len()
    }

    /// Fail every outstanding request
    pub(crate) fn clear(&self) {
        self.waiting.lock().clear();
    }

    /// Wait for the response registered under `msg_id`
    pub(crate) async fn await_reply(
        &self,
        msg_id: u64,
        rx: oneshot::Receiver<Message>,
        peer: &NodeId,
        timeout: Duration,
    ) -> TransportResult<Message> {
        let response = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(TransportError::Closed),
            Err(_) => {
                self.forget(msg_id);
                return Err(TransportError::Timeout {
                    peer: peer.clone(),
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
        };

        if let Some((code, text)) = response.body.error_parts() {
            return Err(TransportError::Remote { code, text });
        }
        Ok(response)
    }
}
