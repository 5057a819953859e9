//! Line-delimited JSON runtime over a byte stream (stdin/stdout in production).
//!
//! Lifecycle:
//! 1. [`StdioRuntime::handshake`] waits for the `init` message, answers
//!    `init_ok` and binds the local node id.
//! 2. [`StdioRuntime::transport`] hands out the [`Transport`] the upper layers
//!    use to send.
//! 3. [`StdioRuntime::serve`] reads until end of input, completing pending
//!    RPCs and spawning one task per inbound request.

use crate::error::{ErrorCode, TransportError, TransportResult};
use crate::message::{Body, InitPayload, Message, NodeId};
use crate::pending::PendingRpcs;
use crate::router::Router;
use crate::traits::Transport;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tokio::sync::Mutex;

/// Settings for the stdio runtime
#[derive(Debug, Clone)]
pub struct StdioConfig {
    /// How long an RPC waits for its response
    pub rpc_timeout: Duration,
}

impl Default for StdioConfig {
    fn default() -> Self {
        Self {
            rpc_timeout: Duration::from_secs(1),
        }
    }
}

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Serialize one message as a single line and flush it
async fn write_line(writer: &mut BoxedWriter, message: &Message) -> TransportResult<()> {
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

/// [`Transport`] writing to a shared output stream
pub struct StdioTransport {
    node_id: NodeId,
    node_ids: Vec<NodeId>,
    writer: Mutex<BoxedWriter>,
    pending: PendingRpcs,
    config: StdioConfig,
}

impl StdioTransport {
    /// Every node in the cluster as announced by `init`
    pub fn cluster(&self) -> &[NodeId] {
        &self.node_ids
    }

    /// Number of RPCs still awaiting a response
    pub fn pending_rpcs(&self) -> usize {
        self.pending.len()
    }

    async fn write(&self, message: &Message) -> TransportResult<()> {
        let mut writer = self.writer.lock().await;
        write_line(&mut writer, message).await
    }

    fn envelope(&self, to: &NodeId, body: Body) -> Message {
        Message {
            src: self.node_id.clone(),
            dest: to.clone(),
            body,
        }
    }
}

#[async_trait]
impl Transport for StdioTransport {
    fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    async fn send(&self, to: &NodeId, body: Body) -> TransportResult<()> {
        tracing::trace!(to = %to, kind = %body.kind, "Sending message");
        self.write(&self.envelope(to, body)).await
    }

    async fn reply(&self, request: &Message, mut body: Body) -> TransportResult<()> {
        body.in_reply_to = request.body.msg_id;
        self.send(&request.src, body).await
    }

    async fn rpc(&self, to: &NodeId, mut body: Body) -> TransportResult<Message> {
        let msg_id = self.pending.next_msg_id();
        body.msg_id = Some(msg_id);
        let rx = self.pending.register(msg_id);

        if let Err(e) = self.send(to, body).await {
            self.pending.forget(msg_id);
            return Err(e);
        }
        self.pending
            .await_reply(msg_id, rx, to, self.config.rpc_timeout)
            .await
    }
}

/// Reader half of the stdio runtime, bound to a node id after `init`
pub struct StdioRuntime<R> {
    lines: Lines<R>,
    transport: Arc<StdioTransport>,
}

impl<R> StdioRuntime<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    /// Wait for `init`, acknowledge it and bind the local node id.
    ///
    /// Requests arriving before `init` are refused with a
    /// temporarily-unavailable error; unparseable lines are skipped.
    pub async fn handshake<W>(reader: R, writer: W, config: StdioConfig) -> TransportResult<Self>
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let mut lines = reader.lines();
        let mut writer: BoxedWriter = Box::new(writer);

        loop {
            let Some(line) = lines.next_line().await? else {
                return Err(TransportError::Handshake(
                    "input closed before init".to_string(),
                ));
            };
            if line.trim().is_empty() {
                continue;
            }
            let message: Message = match serde_json::from_str(&line) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable line before init");
                    continue;
                }
            };

            if message.kind() != "init" {
                tracing::debug!(src = %message.src, kind = %message.kind(), "Message before init");
                if message.body.msg_id.is_some() {
                    let mut body =
                        Body::error(ErrorCode::TemporarilyUnavailable, "node not initialized");
                    body.in_reply_to = message.body.msg_id;
                    let refusal = Message {
                        src: message.dest.clone(),
                        dest: message.src.clone(),
                        body,
                    };
                    write_line(&mut writer, &refusal).await?;
                }
                continue;
            }

            let init: InitPayload = message
                .body
                .decode()
                .map_err(|e| TransportError::Handshake(e.to_string()))?;
            tracing::info!(node = %init.node_id, cluster = init.node_ids.len(), "Node initialized");

            let mut ack = Body::new("init_ok");
            ack.in_reply_to = message.body.msg_id;
            let reply = Message {
                src: init.node_id.clone(),
                dest: message.src.clone(),
                body: ack,
            };
            write_line(&mut writer, &reply).await?;

            let transport = Arc::new(StdioTransport {
                node_id: init.node_id,
                node_ids: init.node_ids,
                writer: Mutex::new(writer),
                pending: PendingRpcs::new(),
                config,
            });
            return Ok(Self { lines, transport });
        }
    }

    /// Transport bound to this runtime's output stream
    pub fn transport(&self) -> Arc<StdioTransport> {
        Arc::clone(&self.transport)
    }

    /// Read and dispatch messages until the input stream ends
    pub async fn serve(mut self, router: Arc<Router>) -> TransportResult<()> {
        while let Some(line) = self.lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let message: Message = match serde_json::from_str(&line) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping undecodable line");
                    continue;
                }
            };

            let Some(message) = self.transport.pending.resolve(message) else {
                continue;
            };
            if message.body.in_reply_to.is_some() {
                tracing::debug!(
                    src = %message.src,
                    kind = %message.kind(),
                    "Dropping reply with no outstanding request"
                );
                continue;
            }

            let transport = Arc::clone(&self.transport);
            let router = Arc::clone(&router);
            tokio::spawn(async move {
                router.handle_inbound(transport.as_ref(), message).await;
            });
        }

        tracing::info!(node = %self.transport.node_id, "Input closed, shutting down");
        self.transport.pending.clear();
        Ok(())
    }
}
