#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]
#![allow(missing_docs, clippy::cast_possible_truncation)]
//! # Murmur Anti-Entropy - gossip engine
//!
//! Eventually delivers every broadcast integer to every node over a fixed
//! neighbor graph:
//! - [`ValueStore`]: monotone set of observed values
//! - [`TopologyTable`]: neighbor lists installed by the coordinator
//! - [`AckTracker`]: per-neighbor lower bound of what that neighbor holds
//! - [`GossipNode`]: the `broadcast`/`read`/`topology`/`sync` handlers and
//!   the per-neighbor exchange
//! - [`SyncScheduler`]: fixed-period driver of sync rounds
//!
//! ## Design Principles
//!
//! - **Delta Exchange**: only values a neighbor is not known to hold are sent
//! - **Bidirectional**: a `sync_ok` carries the responder's complementary delta
//! - **Confirmed Knowledge**: the tracker advances only after a completed exchange
//! - **Retry by Resubmission**: failed deltas stay unknown and are resent next tick
//! - **One Lock at a Time**: no task holds two locks or a lock across the network

pub mod config;
pub mod error;
pub mod node;
pub mod prelude;
pub mod scheduler;
pub mod stats;
pub mod store;
pub mod topology;
pub mod tracker;
pub mod value;
pub mod wire;

pub use config::AntiEntropyConfig;
pub use error::{GossipError, GossipResult};
pub use node::{GossipNode, RoundReport, SyncOutcome};
pub use scheduler::{SchedulerHandle, SyncScheduler};
pub use stats::{GossipStats, StatsSnapshot};
pub use store::ValueStore;
pub use topology::{Topology, TopologyTable};
pub use tracker::AckTracker;
pub use value::GossipValue;
pub use wire::GossipPayload;
