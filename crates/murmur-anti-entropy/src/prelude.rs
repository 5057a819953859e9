//! Murmur anti-entropy prelude.
//!
//! Curated re-exports for wiring a node.

pub use crate::{
    AntiEntropyConfig, GossipError, GossipNode, GossipPayload, GossipValue, RoundReport,
    SchedulerHandle, SyncOutcome, SyncScheduler, Topology,
};
pub use murmur_transport::{MemoryNetwork, NodeId, Router, Transport};
