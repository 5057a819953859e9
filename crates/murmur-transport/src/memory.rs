//! In-process network for simulation and tests.
//!
//! Every node joins a shared [`MemoryNetwork`] and gets a [`MemoryTransport`]
//! with the same request/response semantics as the stdio runtime. Links can
//! be cut and restored to model partitions; messages on a cut link are
//! dropped silently, so RPCs across it end in a timeout.

use crate::error::{TransportError, TransportResult};
use crate::message::{Body, Message, NodeId};
use crate::pending::PendingRpcs;
use crate::router::Router;
use crate::traits::Transport;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};
use std::time::Duration;

#[derive(Default)]
struct NetworkInner {
    nodes: RwLock<HashMap<NodeId, Weak<MemoryTransport>>>,
    /// Cut links, stored with the smaller id first
    severed: RwLock<BTreeSet<(NodeId, NodeId)>>,
}

/// Shared in-memory message fabric
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    inner: Arc<NetworkInner>,
    rpc_timeout: Option<Duration>,
}

fn link(a: &NodeId, b: &NodeId) -> (NodeId, NodeId) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

impl MemoryNetwork {
    /// Network whose RPCs wait at most one second
    pub fn new() -> Self {
        Self::default()
    }

    /// Network with a custom RPC timeout
    pub fn with_rpc_timeout(rpc_timeout: Duration) -> Self {
        Self {
            inner: Arc::default(),
            rpc_timeout: Some(rpc_timeout),
        }
    }

    /// Attach a node and return its transport.
    ///
    /// The network only keeps a weak reference; the node is gone once the
    /// returned transport is dropped.
    pub fn join(&self, node_id: impl Into<NodeId>) -> Arc<MemoryTransport> {
        let node_id = node_id.into();
        let transport = Arc::new(MemoryTransport {
            node_id: node_id.clone(),
            network: self.clone(),
            router: RwLock::new(None),
            pending: PendingRpcs::new(),
            rpc_timeout: self.rpc_timeout.unwrap_or(Duration::from_secs(1)),
        });
        self.inner
            .nodes
            .write()
            .insert(node_id, Arc::downgrade(&transport));
        transport
    }

    /// Drop every message between `a` and `b` until [`heal`](Self::heal)
    pub fn partition(&self, a: &NodeId, b: &NodeId) {
        self.inner.severed.write().insert(link(a, b));
    }

    /// Restore the link between `a` and `b`
    pub fn heal(&self, a: &NodeId, b: &NodeId) {
        self.inner.severed.write().remove(&link(a, b));
    }

    /// Restore every link
    pub fn heal_all(&self) {
        self.inner.severed.write().clear();
    }

    fn lookup(&self, node_id: &NodeId) -> Option<Arc<MemoryTransport>> {
        self.inner.nodes.read().get(node_id).and_then(Weak::upgrade)
    }

    fn deliver(&self, message: Message) -> TransportResult<()> {
        let Some(dest) = self.lookup(&message.dest) else {
            return Err(TransportError::UnknownPeer(message.dest));
        };

        if self
            .inner
            .severed
            .read()
            .contains(&link(&message.src, &message.dest))
        {
            tracing::trace!(src = %message.src, dest = %message.dest, "Link cut, dropping message");
            return Ok(());
        }

        dest.receive(message);
        Ok(())
    }
}

/// One node's view of a [`MemoryNetwork`]
pub struct MemoryTransport {
    node_id: NodeId,
    network: MemoryNetwork,
    router: RwLock<Option<Arc<Router>>>,
    pending: PendingRpcs,
    rpc_timeout: Duration,
}

impl MemoryTransport {
    /// Start handing inbound requests to `router`.
    ///
    /// Until this is called requests are dropped; responses to our own RPCs
    /// are always delivered, so pure clients never need a router.
    pub fn serve(&self, router: Arc<Router>) {
        *self.router.write() = Some(router);
    }

    /// Number of RPCs still awaiting a response
    pub fn pending_rpcs(&self) -> usize {
        self.pending.len()
    }

    fn receive(self: Arc<Self>, message: Message) {
        let Some(message) = self.pending.resolve(message) else {
            return;
        };
        if message.body.in_reply_to.is_some() {
            tracing::debug!(
                node = %self.node_id,
                src = %message.src,
                "Dropping reply with no outstanding request"
            );
            return;
        }

        let Some(router) = self.router.read().clone() else {
            tracing::debug!(node = %self.node_id, kind = %message.kind(), "No router attached");
            return;
        };
        tokio::spawn(async move {
            router.handle_inbound(self.as_ref(), message).await;
        });
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    async fn send(&self, to: &NodeId, body: Body) -> TransportResult<()> {
        self.network.deliver(Message {
            src: self.node_id.clone(),
            dest: to.clone(),
            body,
        })
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
            .await_reply(msg_id, rx, to, self.rpc_timeout)
            .await
    }
}
