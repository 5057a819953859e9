//! Gossip wire payloads.
//!
//! Field names are fixed by the cluster protocol. `sync`, `sync_ok` and
//! `topology` omit empty collections; `read_ok` always carries `messages`
//! because read clients require the field.

use crate::error::GossipError;
use crate::topology::Topology;
use crate::value::GossipValue;
use murmur_transport::Body;
use serde::{Deserialize, Deserializer, Serialize};

/// Every body the gossip engine sends or understands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GossipPayload {
    /// Client submits a value.
    ///
    /// Kept loosely typed: a non-integer `message` is ignored, not rejected.
    Broadcast {
        #[serde(default)]
        message: serde_json::Value,
    },
    BroadcastOk,
    Read,
    ReadOk {
        #[serde(default, deserialize_with = "null_as_empty")]
        messages: Vec<GossipValue>,
    },
    Topology {
        #[serde(default, skip_serializing_if = "Topology::is_empty")]
        topology: Topology,
    },
    TopologyOk,
    /// Anti-entropy delta pushed to a neighbor
    Sync {
        #[serde(
            default,
            skip_serializing_if = "Vec::is_empty",
            deserialize_with = "null_as_empty"
        )]
        messages: Vec<GossipValue>,
    },
    /// The responder's complementary delta
    SyncOk {
        #[serde(
            default,
            skip_serializing_if = "Vec::is_empty",
            deserialize_with = "null_as_empty"
        )]
        messages: Vec<GossipValue>,
    },
}

impl GossipPayload {
    /// Message type tag as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            GossipPayload::Broadcast { .. } => "broadcast",
            GossipPayload::BroadcastOk => "broadcast_ok",
            GossipPayload::Read => "read",
            GossipPayload::ReadOk { .. } => "read_ok",
            GossipPayload::Topology { .. } => "topology",
            GossipPayload::TopologyOk => "topology_ok",
            GossipPayload::Sync { .. } => "sync",
            GossipPayload::SyncOk { .. } => "sync_ok",
        }
    }

    /// Inbound request types served by a gossip node
    pub const REQUEST_KINDS: [&str; 4] = ["broadcast", "read", "topology", "sync"];

    pub fn to_body(&self) -> Result<Body, GossipError> {
        Body::from_payload(self).map_err(GossipError::Encode)
    }

    pub fn from_body(body: &Body) -> Result<Self, GossipError> {
        body.decode().map_err(GossipError::Decode)
    }
}

/// Peers may send `"messages": null` for an empty delta.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<GossipValue>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<GossipValue>>::deserialize(deserializer)?.unwrap_or_default())
}
