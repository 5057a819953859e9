//! Shared cluster harness for gossip integration tests.

#![allow(dead_code)]

use murmur_anti_entropy::prelude::*;
use murmur_transport::{Body, MemoryTransport, Message};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// A set of gossip nodes plus one client on a shared in-memory network
pub struct Cluster {
    pub network: MemoryNetwork,
    pub nodes: Vec<Arc<GossipNode>>,
    pub client: Arc<MemoryTransport>,
}

pub fn node_id(index: usize) -> NodeId {
    NodeId::new(format!("n{index}"))
}

impl Cluster {
    /// `size` nodes named `n0..n{size-1}`, no topology installed yet
    pub fn new(size: usize) -> Self {
        let network = MemoryNetwork::with_rpc_timeout(Duration::from_millis(50));
        let nodes = (0..size)
            .map(|i| {
                let transport = network.join(node_id(i));
                let node = GossipNode::new(transport.clone());
                transport.serve(Arc::new(node.router()));
                node
            })
            .collect();
        let client = network.join("c1");
        Self {
            network,
            nodes,
            client,
        }
    }

    /// Client request to node `index`, returning the decoded reply
    pub async fn request(&self, index: usize, payload: GossipPayload) -> GossipPayload {
        let reply = self.raw_request(index, payload.to_body().unwrap()).await;
        GossipPayload::from_body(&reply.body).unwrap()
    }

    pub async fn raw_request(&self, index: usize, body: Body) -> Message {
        self.client.rpc(&node_id(index), body).await.unwrap()
    }

    pub async fn broadcast(&self, index: usize, value: i64) {
        let reply = self
            .request(
                index,
                GossipPayload::Broadcast {
                    message: value.into(),
                },
            )
            .await;
        assert_eq!(reply, GossipPayload::BroadcastOk);
    }

    pub async fn read(&self, index: usize) -> BTreeSet<i64> {
        match self.request(index, GossipPayload::Read).await {
            GossipPayload::ReadOk { messages } => messages.into_iter().map(|v| v.0).collect(),
            other => panic!("unexpected read reply: {other:?}"),
        }
    }

    /// Send the same topology to every node through the `topology` message
    pub async fn install(&self, topology: &Topology) {
        for i in 0..self.nodes.len() {
            let reply = self
                .request(
                    i,
                    GossipPayload::Topology {
                        topology: topology.clone(),
                    },
                )
                .await;
            assert_eq!(reply, GossipPayload::TopologyOk);
        }
    }

    /// One sync round on every node, in index order
    pub async fn sweep(&self) -> Vec<RoundReport> {
        let mut reports = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            reports.push(node.sync_round().await);
        }
        reports
    }

    /// Whether every node holds exactly `expected`
    pub async fn converged_on(&self, expected: &BTreeSet<i64>) -> bool {
        for node in &self.nodes {
            let held: BTreeSet<i64> = node
                .store()
                .all_values()
                .await
                .into_iter()
                .map(|v| v.0)
                .collect();
            if &held != expected {
                return false;
            }
        }
        true
    }
}

/// Undirected graph over `n0..` from a list of edges
pub fn topology_from_edges(size: usize, edges: &[(usize, usize)]) -> Topology {
    let mut topology: Topology = (0..size).map(|i| (node_id(i), Vec::new())).collect();
    for &(a, b) in edges {
        topology.entry(node_id(a)).or_default().push(node_id(b));
        topology.entry(node_id(b)).or_default().push(node_id(a));
    }
    topology
}

/// `n0 - n1 - ... - n{size-1}`
pub fn line(size: usize) -> Topology {
    let edges: Vec<(usize, usize)> = (1..size).map(|i| (i - 1, i)).collect();
    topology_from_edges(size, &edges)
}
