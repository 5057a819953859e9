//! Gossip node: message dispatch and per-neighbor anti-entropy exchange.
//!
//! ## Exchange direction
//!
//! Outbound, to neighbor N with delta D:
//! `sync{D}` → `sync_ok{R}`; merge R, then mark `D ∪ R` as known to N.
//!
//! Inbound, from sender S with values V:
//! merge V, mark V as known to S, reply `sync_ok{unknown_to(S)}`. The reply
//! delta is *not* marked: the reply may be lost, and S confirms receipt by
//! marking it on its side. At worst this costs one redundant resend from us.

use crate::error::{GossipError, GossipResult};
use crate::stats::{GossipStats, StatsSnapshot};
use crate::store::ValueStore;
use crate::topology::TopologyTable;
use crate::tracker::AckTracker;
use crate::value::GossipValue;
use crate::wire::GossipPayload;
use async_trait::async_trait;
use murmur_transport::{HandlerError, Message, MessageHandler, NodeId, Router, Transport};
use std::sync::Arc;

/// Result of one attempted exchange with a neighbor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing to send; no request was issued
    Skipped,
    /// Round trip completed
    Synced {
        /// Values we pushed
        sent: usize,
        /// Values the neighbor pushed back
        received: usize,
    },
}

/// Summary of one scheduler round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundReport {
    pub neighbors: usize,
    pub skipped: usize,
    pub synced: usize,
    pub failed: usize,
}

/// One cluster member running the anti-entropy broadcast protocol
pub struct GossipNode {
    transport: Arc<dyn Transport>,
    store: ValueStore,
    topology: TopologyTable,
    tracker: AckTracker,
    stats: GossipStats,
}

impl GossipNode {
    pub fn new(transport: Arc<dyn Transport>) -> Arc<Self> {
        Arc::new(Self {
            transport,
            store: ValueStore::new(),
            topology: TopologyTable::new(),
            tracker: AckTracker::new(),
            stats: GossipStats::default(),
        })
    }

    pub fn node_id(&self) -> &NodeId {
        self.transport.node_id()
    }

    pub fn store(&self) -> &ValueStore {
        &self.store
    }

    pub fn topology(&self) -> &TopologyTable {
        &self.topology
    }

    pub fn tracker(&self) -> &AckTracker {
        &self.tracker
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Router serving `broadcast`, `read`, `topology` and `sync` with this node
    pub fn router(self: &Arc<Self>) -> Router {
        let mut router = Router::new();
        for kind in GossipPayload::REQUEST_KINDS {
            router.route(kind, Arc::clone(self) as Arc<dyn MessageHandler>);
        }
        router
    }

    /// Store a client-submitted value.
    ///
    /// Returns `false` when the payload is not an integer and was dropped.
    pub async fn accept_broadcast(&self, message: &serde_json::Value) -> bool {
        let Some(value) = GossipValue::from_json(message) else {
            tracing::debug!(
                node = %self.node_id(),
                payload = %message,
                "Ignoring non-integer broadcast"
            );
            self.stats.record_broadcast(false);
            return false;
        };
        if self.store.insert(value).await {
            tracing::trace!(node = %self.node_id(), value = %value, "Accepted broadcast");
        }
        self.stats.record_broadcast(true);
        true
    }

    /// Merge a delta pushed by `from` and compute the complementary delta
    pub async fn accept_sync(&self, from: &NodeId, messages: &[GossipValue]) -> Vec<GossipValue> {
        let merged = self.store.insert_all(messages).await;
        self.stats.record_merged(merged);
        // Anything `from` just sent us, it already has.
        self.tracker.mark_known(from, messages).await;

        let delta = self.tracker.unknown_to(from, &self.store).await;
        tracing::debug!(
            node = %self.node_id(),
            peer = %from,
            received = messages.len(),
            merged,
            reply = delta.len(),
            "Handled inbound sync"
        );
        delta
    }

    /// Run one anti-entropy exchange with `neighbor`.
    ///
    /// The tracker only advances once the neighbor has answered, so a failed
    /// exchange leaves the delta in place for the next round.
    pub async fn sync_with(&self, neighbor: &NodeId) -> GossipResult<SyncOutcome> {
        let delta = self.tracker.unknown_to(neighbor, &self.store).await;
        if delta.is_empty() {
            tracing::trace!(node = %self.node_id(), peer = %neighbor, "Neighbor up to date");
            return Ok(SyncOutcome::Skipped);
        }

        let result = self.exchange(neighbor, delta).await;
        self.stats.record_sync(result.is_ok());
        result
    }

    async fn exchange(
        &self,
        neighbor: &NodeId,
        delta: Vec<GossipValue>,
    ) -> GossipResult<SyncOutcome> {
        let request = GossipPayload::Sync {
            messages: delta.clone(),
        }
        .to_body()?;
        let response = self.transport.rpc(neighbor, request).await?;

        let returned = match GossipPayload::from_body(&response.body)? {
            GossipPayload::SyncOk { messages } => messages,
            other => {
                return Err(GossipError::UnexpectedReply {
                    expected: "sync_ok",
                    actual: other.kind().to_string(),
                })
            }
        };

        let merged = self.store.insert_all(&returned).await;
        self.stats.record_merged(merged);
        let confirmed: Vec<GossipValue> = delta.iter().chain(&returned).copied().collect();
        self.tracker.mark_known(neighbor, &confirmed).await;

        tracing::debug!(
            node = %self.node_id(),
            peer = %neighbor,
            sent = delta.len(),
            received = returned.len(),
            merged,
            "Sync round trip complete"
        );
        Ok(SyncOutcome::Synced {
            sent: delta.len(),
            received: returned.len(),
        })
    }

    /// Sync with every neighbor concurrently and wait for all exchanges.
    ///
    /// Each neighbor gets its own task, so a slow or silent neighbor only
    /// delays its own exchange.
    pub async fn sync_round(self: &Arc<Self>) -> RoundReport {
        self.stats.record_round();
        let neighbors = self.topology.neighbors_of(self.node_id()).await;

        let tasks: Vec<_> = neighbors
            .into_iter()
            .map(|neighbor| {
                let node = Arc::clone(self);
                tokio::spawn(async move {
                    let result = node.sync_with(&neighbor).await;
                    (neighbor, result)
                })
            })
            .collect();

        let mut report = RoundReport {
            neighbors: tasks.len(),
            ..RoundReport::default()
        };
        for joined in futures::future::join_all(tasks).await {
            match joined {
                Ok((_, Ok(SyncOutcome::Skipped))) => report.skipped += 1,
                Ok((_, Ok(SyncOutcome::Synced { .. }))) => report.synced += 1,
                Ok((neighbor, Err(e))) => {
                    tracing::warn!(
                        node = %self.node_id(),
                        peer = %neighbor,
                        error = %e,
                        "Sync with neighbor failed, retrying next round"
                    );
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::error!(node = %self.node_id(), error = %e, "Sync task aborted");
                    report.failed += 1;
                }
            }
        }

        tracing::trace!(
            node = %self.node_id(),
            report = ?report,
            stats = ?self.stats(),
            "Sync round finished"
        );
        report
    }

    async fn dispatch(&self, message: &Message) -> GossipResult<()> {
        let reply = match GossipPayload::from_body(&message.body)? {
            GossipPayload::Broadcast { message: value } => {
                self.accept_broadcast(&value).await;
                GossipPayload::BroadcastOk
            }
            GossipPayload::Read => GossipPayload::ReadOk {
                messages: self.store.all_values().await,
            },
            GossipPayload::Topology { topology } => {
                tracing::info!(
                    node = %self.node_id(),
                    neighbors = ?topology.get(self.node_id()),
                    "Installing topology"
                );
                self.topology.set_topology(topology).await;
                GossipPayload::TopologyOk
            }
            GossipPayload::Sync { messages } => GossipPayload::SyncOk {
                messages: self.accept_sync(&message.src, &messages).await,
            },
            other => return Err(GossipError::Unsupported(other.kind().to_string())),
        };

        self.transport.reply(message, reply.to_body()?).await?;
        Ok(())
    }
}

#[async_trait]
impl MessageHandler for GossipNode {
    async fn handle(&self, message: Message) -> Result<(), HandlerError> {
        self.dispatch(&message).await.map_err(HandlerError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Topology;
    use assert_matches::assert_matches;
    use murmur_transport::{MemoryNetwork, TransportError};
    use serde_json::json;
    use std::time::Duration;

    fn values(raw: &[i64]) -> Vec<GossipValue> {
        raw.iter().copied().map(GossipValue).collect()
    }

    fn served(network: &MemoryNetwork, id: &str) -> Arc<GossipNode> {
        let transport = network.join(id);
        let node = GossipNode::new(transport.clone());
        transport.serve(Arc::new(node.router()));
        node
    }

    #[tokio::test]
    async fn broadcast_accepts_integers_only() {
        let network = MemoryNetwork::new();
        let node = GossipNode::new(network.join("n1"));

        assert!(node.accept_broadcast(&json!(5)).await);
        assert!(!node.accept_broadcast(&json!("not-a-number")).await);
        assert!(!node.accept_broadcast(&json!({"nested": 1})).await);

        assert_eq!(node.store().all_values().await, values(&[5]));
        let stats = node.stats();
        assert_eq!(stats.broadcasts_accepted, 1);
        assert_eq!(stats.broadcasts_ignored, 2);
    }

    #[tokio::test]
    async fn inbound_sync_marks_sender_and_returns_complement() {
        let network = MemoryNetwork::new();
        let node = GossipNode::new(network.join("n1"));
        node.store().insert_all(&values(&[1, 2])).await;

        let reply = node.accept_sync(&"n2".into(), &values(&[2, 3])).await;

        assert_eq!(reply, values(&[1]));
        assert_eq!(node.store().all_values().await, values(&[1, 2, 3]));
        // Only what the sender pushed counts as known; the reply is unconfirmed.
        assert_eq!(
            node.tracker().known_by(&"n2".into()).await,
            values(&[2, 3]).into_iter().collect()
        );
    }

    #[tokio::test]
    async fn sync_with_skips_when_neighbor_is_up_to_date() {
        let network = MemoryNetwork::new();
        let a = served(&network, "a");
        let _b = served(&network, "b");

        let outcome = a.sync_with(&"b".into()).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Skipped);
        assert_eq!(a.stats().syncs_sent, 0);
    }

    #[tokio::test]
    async fn round_trip_marks_both_deltas() {
        let network = MemoryNetwork::new();
        let a = served(&network, "a");
        let b = served(&network, "b");

        a.store().insert_all(&values(&[1])).await;
        b.store().insert_all(&values(&[2])).await;

        let outcome = a.sync_with(&"b".into()).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Synced { sent: 1, received: 1 });

        assert_eq!(a.store().all_values().await, values(&[1, 2]));
        assert_eq!(b.store().all_values().await, values(&[1, 2]));
        assert!(a.tracker().unknown_to(&"b".into(), a.store()).await.is_empty());
        assert_eq!(a.sync_with(&"b".into()).await.unwrap(), SyncOutcome::Skipped);
    }

    #[tokio::test]
    async fn failed_exchange_leaves_tracker_untouched() {
        let network = MemoryNetwork::with_rpc_timeout(Duration::from_millis(20));
        let node = GossipNode::new(network.join("n1"));
        node.store().insert(GossipValue(9)).await;

        let result = node.sync_with(&"ghost".into()).await;
        assert_matches!(result, Err(GossipError::Transport(TransportError::UnknownPeer(_))));
        assert_eq!(node.tracker().tracked_peers().await, 0);
        assert_eq!(node.stats().syncs_failed, 1);
    }

    #[tokio::test]
    async fn round_without_topology_does_nothing() {
        let network = MemoryNetwork::new();
        let node = GossipNode::new(network.join("n1"));
        node.store().insert(GossipValue(1)).await;

        let report = node.sync_round().await;
        assert_eq!(report, RoundReport::default());
        assert_eq!(node.stats().rounds, 1);
    }

    #[tokio::test]
    async fn round_reports_each_neighbor() {
        let network = MemoryNetwork::with_rpc_timeout(Duration::from_millis(20));
        let node = served(&network, "n1");
        let peer = served(&network, "n2");

        let mut topology = Topology::new();
        topology.insert("n1".into(), vec!["n2".into(), "n3".into()]);
        node.topology().set_topology(topology).await;
        node.store().insert(GossipValue(4)).await;

        let report = node.sync_round().await;
        assert_eq!(
            report,
            RoundReport {
                neighbors: 2,
                skipped: 0,
                synced: 1,
                failed: 1
            }
        );
        assert!(peer.store().contains(GossipValue(4)).await);
    }

    #[tokio::test]
    async fn neighbor_syncs_run_as_independent_tasks() {
        fn assert_send<T: Send>(_: &T) {}

        let network = MemoryNetwork::new();
        let a = served(&network, "a");
        let b = served(&network, "b");
        a.store().insert(GossipValue(3)).await;

        let b_id: NodeId = "b".into();
        let exchange = a.sync_with(&b_id);
        assert_send(&exchange);
        drop(exchange);

        let node = Arc::clone(&a);
        let outcome = tokio::spawn(async move { node.sync_with(&"b".into()).await })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, SyncOutcome::Synced { sent: 1, received: 0 });
        assert!(b.store().contains(GossipValue(3)).await);
    }

    #[tokio::test]
    async fn silent_neighbor_does_not_hold_up_the_others() {
        let timeout = Duration::from_millis(800);
        let network = MemoryNetwork::with_rpc_timeout(timeout);
        let hub = served(&network, "n0");
        let _silent = served(&network, "n1");
        let healthy = served(&network, "n2");
        network.partition(&"n0".into(), &"n1".into());

        let mut topology = Topology::new();
        topology.insert("n0".into(), vec!["n1".into(), "n2".into()]);
        hub.topology().set_topology(topology).await;
        hub.store().insert(GossipValue(5)).await;

        let started = tokio::time::Instant::now();
        let round = tokio::spawn({
            let hub = Arc::clone(&hub);
            async move { hub.sync_round().await }
        });

        while !healthy.store().contains(GossipValue(5)).await {
            assert!(
                started.elapsed() < timeout / 2,
                "healthy neighbor waited on the silent one"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let report = round.await.unwrap();
        assert_eq!(
            report,
            RoundReport {
                neighbors: 2,
                skipped: 0,
                synced: 1,
                failed: 1
            }
        );
        assert!(started.elapsed() >= timeout);
    }
}
