//! Anti-entropy runtime configuration.

use crate::error::{GossipError, GossipResult};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AntiEntropyConfig {
    /// Period between sync rounds
    pub sync_interval: Duration,
}

impl Default for AntiEntropyConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_millis(500),
        }
    }
}

impl AntiEntropyConfig {
    pub fn with_sync_interval(sync_interval: Duration) -> Self {
        Self { sync_interval }
    }

    pub fn validate(&self) -> GossipResult<()> {
        if self.sync_interval.is_zero() {
            return Err(GossipError::Config(
                "sync_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
