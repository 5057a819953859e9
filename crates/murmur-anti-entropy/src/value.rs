//! Gossiped values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque integer fact disseminated through the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GossipValue(pub i64);

impl GossipValue {
    /// Interpret a loosely typed JSON value.
    ///
    /// Integers and integral floats (`5.0`) are accepted; everything else,
    /// including fractional or out-of-range numbers, yields `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        if let Some(int) = value.as_i64() {
            return Some(Self(int));
        }
        let float = value.as_f64()?;
        let in_range = float >= i64::MIN as f64 && float < i64::MAX as f64;
        if float.fract() == 0.0 && in_range {
            return Some(Self(float as i64));
        }
        None
    }
}

impl From<i64> for GossipValue {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for GossipValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
