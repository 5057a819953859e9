//! Per-neighbor acknowledgment tracking.
//!
//! For each neighbor the tracker holds a lower bound on what that neighbor
//! already has. A value is recorded only after a confirmed exchange with the
//! neighbor: we received it from them, or they answered the `sync` that
//! carried it. The sets grow for the life of the process and are never
//! compacted; bounding their memory would need an explicit compaction policy.

use crate::store::ValueStore;
use crate::value::GossipValue;
use async_lock::RwLock;
use murmur_transport::NodeId;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default)]
pub struct AckTracker {
    known: RwLock<BTreeMap<NodeId, BTreeSet<GossipValue>>>,
}

impl AckTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values in `store` that `neighbor` is not known to hold.
    ///
    /// The store snapshot is taken before the tracker lock, so the two locks
    /// are never held together.
    pub async fn unknown_to(&self, neighbor: &NodeId, store: &ValueStore) -> Vec<GossipValue> {
        let all = store.all_values().await;
        let known = self.known.read().await;
        match known.get(neighbor) {
            Some(acked) => all.into_iter().filter(|v| !acked.contains(v)).collect(),
            None => all,
        }
    }

    /// Record that `neighbor` holds `values`.
    ///
    /// Empty input neither takes the lock nor creates an entry.
    pub async fn mark_known(&self, neighbor: &NodeId, values: &[GossipValue]) {
        if values.is_empty() {
            return;
        }
        let mut known = self.known.write().await;
        known
            .entry(neighbor.clone())
            .or_default()
            .extend(values.iter().copied());
    }

    /// Snapshot of what `neighbor` is known to hold
    pub async fn known_by(&self, neighbor: &NodeId) -> BTreeSet<GossipValue> {
        self.known
            .read()
            .await
            .get(neighbor)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of neighbors with at least one acknowledged value
    pub async fn tracked_peers(&self) -> usize {
        self.known.read().await.len()
    }
}
