//! Message envelope and body types.
//!
//! Every message on the wire is a single JSON object:
//!
//! ```json
//! {"src": "n1", "dest": "n2", "body": {"type": "sync", "msg_id": 4, "messages": [1, 2]}}
//! ```
//!
//! The body always carries a `type`; `msg_id` and `in_reply_to` are present
//! only when the message takes part in a request/response exchange. All
//! remaining payload fields sit next to them and are kept untyped here so
//! higher layers can decode them into their own payload enums.

use crate::error::ErrorCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node (or client) in the cluster
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a node identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A single addressed message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Sender
    pub src: NodeId,
    /// Recipient
    pub dest: NodeId,
    /// Typed body
    pub body: Body,
}

impl Message {
    /// Message type, e.g. `"broadcast"`
    pub fn kind(&self) -> &str {
        &self.body.kind
    }
}

/// Message body: a type tag, correlation ids and free-form payload fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Message type
    #[serde(rename = "type")]
    pub kind: String,
    /// Request id, set by the sender of an RPC
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<u64>,
    /// Id of the request this body answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<u64>,
    /// Remaining payload fields
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Body {
    /// Body with only a type tag
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            msg_id: None,
            in_reply_to: None,
            fields: serde_json::Map::new(),
        }
    }

    /// Encode a payload that serializes to a JSON object with a `type` field.
    ///
    /// Internally tagged serde enums (`#[serde(tag = "type")]`) are the
    /// intended input.
    pub fn from_payload<P: Serialize>(payload: &P) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(payload)?)
    }

    /// Decode the type tag and payload fields into `P`.
    ///
    /// Correlation ids are visible to `P` as ordinary fields; payload types
    /// that do not declare them simply ignore them.
    pub fn decode<P: DeserializeOwned>(&self) -> Result<P, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(self)?)
    }

    /// `error` body understood by every node
    pub fn error(code: ErrorCode, text: impl Into<String>) -> Self {
        let mut body = Self::new("error");
        body.fields
            .insert("code".to_string(), serde_json::Value::from(code.code()));
        body.fields
            .insert("text".to_string(), serde_json::Value::from(text.into()));
        body
    }

    /// Whether this is an `error` body
    pub fn is_error(&self) -> bool {
        self.kind == "error"
    }

    /// Code and text of an `error` body
    pub fn error_parts(&self) -> Option<(u32, String)> {
        if !self.is_error() {
            return None;
        }
        let code = self
            .fields
            .get("code")
            .and_then(serde_json::Value::as_u64)
            .and_then(|c| u32::try_from(c).ok())
            .unwrap_or_else(|| ErrorCode::Crash.code());
        let text = self
            .fields
            .get("text")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        Some((code, text))
    }
}

/// `init` payload delivered once by the cluster harness at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitPayload {
    /// Identifier assigned to this node
    pub node_id: NodeId,
    /// Every node in the cluster, this one included
    #[serde(default)]
    pub node_ids: Vec<NodeId>,
}
