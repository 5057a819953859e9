//! Monotone set of delivered values.

use crate::value::GossipValue;
use async_lock::RwLock;
use std::collections::BTreeSet;

/// Deduplicated set of every value this node has observed.
///
/// Membership only grows: there is no removal operation.
#[derive(Debug, Default)]
pub struct ValueStore {
    values: RwLock<BTreeSet<GossipValue>>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value`; returns whether it was new
    pub async fn insert(&self, value: GossipValue) -> bool {
        let mut values = self.values.write().await;
        values.insert(value)
    }

    /// Add every value in `batch`; returns how many were new.
    ///
    /// An empty batch returns without touching the lock.
    pub async fn insert_all(&self, batch: &[GossipValue]) -> usize {
        if batch.is_empty() {
            return 0;
        }
        let mut values = self.values.write().await;
        batch.iter().filter(|v| values.insert(**v)).count()
    }

    /// Consistent snapshot of every stored value, ascending
    pub async fn all_values(&self) -> Vec<GossipValue> {
        let values = self.values.read().await;
        values.iter().copied().collect()
    }

    pub async fn contains(&self, value: GossipValue) -> bool {
        self.values.read().await.contains(&value)
    }

    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.values.read().await.is_empty()
    }
}
