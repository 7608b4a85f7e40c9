//! Collaboration settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a collaboration client and its session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollabConfig {
    /// Minimum time between two outbound batches (ms).
    pub flush_interval_ms: u64,
    /// Consecutive rejected batches tolerated before the session gives up.
    pub max_consecutive_rejections: u32,
    /// Maximum steps per outbound batch.
    pub max_batch_steps: usize,
}

impl CollabConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

impl Default for CollabConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: 200,
            max_consecutive_rejections: 8,
            max_batch_steps: 1000,
        }
    }
}
