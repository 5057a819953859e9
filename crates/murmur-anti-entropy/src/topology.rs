//! Neighbor table installed by the cluster coordinator.

use async_lock::RwLock;
use murmur_transport::NodeId;
use std::collections::BTreeMap;

/// Full adjacency as delivered by a `topology` message
pub type Topology = BTreeMap<NodeId, Vec<NodeId>>;

/// Node id to ordered neighbor list.
///
/// Expected to be written once before steady-state gossip starts; installs
/// still go through the lock so concurrent readers never see a torn table.
#[derive(Debug, Default)]
pub struct TopologyTable {
    table: RwLock<Option<Topology>>,
}

impl TopologyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole table
    pub async fn set_topology(&self, topology: Topology) {
        *self.table.write().await = Some(topology);
    }

    /// Neighbors of `node`, empty when unknown or not yet installed
    pub async fn neighbors_of(&self, node: &NodeId) -> Vec<NodeId> {
        self.table
            .read()
            .await
            .as_ref()
            .and_then(|table| table.get(node))
            .cloned()
            .unwrap_or_default()
    }

    pub async fn is_installed(&self) -> bool {
        self.table.read().await.is_some()
    }
}
