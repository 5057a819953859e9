//! Counters for gossip activity.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, updated lock-free from any task
#[derive(Debug, Default)]
pub struct GossipStats {
    rounds: AtomicU64,
    syncs_sent: AtomicU64,
    syncs_failed: AtomicU64,
    values_merged: AtomicU64,
    broadcasts_accepted: AtomicU64,
    broadcasts_ignored: AtomicU64,
}

/// Point-in-time copy of [`GossipStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Sync rounds started
    pub rounds: u64,
    /// Outbound `sync` requests answered
    pub syncs_sent: u64,
    /// Outbound `sync` requests that failed
    pub syncs_failed: u64,
    /// Values learned from peers (either direction)
    pub values_merged: u64,
    /// Broadcasts carrying a well-formed value
    pub broadcasts_accepted: u64,
    /// Broadcasts whose value was ignored
    pub broadcasts_ignored: u64,
}

impl GossipStats {
    pub(crate) fn record_round(&self) {
        self.rounds.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sync(&self, ok: bool) {
        let counter = if ok {
            &self.syncs_sent
        } else {
            &self.syncs_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_merged(&self, count: usize) {
        self.values_merged.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_broadcast(&self, accepted: bool) {
        let counter = if accepted {
            &self.broadcasts_accepted
        } else {
            &self.broadcasts_ignored
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            rounds: self.rounds.load(Ordering::Relaxed),
            syncs_sent: self.syncs_sent.load(Ordering::Relaxed),
            syncs_failed: self.syncs_failed.load(Ordering::Relaxed),
            values_merged: self.values_merged.load(Ordering::Relaxed),
            broadcasts_accepted: self.broadcasts_accepted.load(Ordering::Relaxed),
            broadcasts_ignored: self.broadcasts_ignored.load(Ordering::Relaxed),
        }
    }
}
