// SPDX-License-Identifier: MIT
//
// Queue and dispatch configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Persistent settings for the queue processor and job monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Seconds between dispatch loop cycles.
    pub poll_interval_secs: u64,
    /// Upper bound on waiting for a printer's spooler to drain, in
    /// milliseconds. Expiry is a reported outcome, not an error.
    pub monitor_max_wait_ms: u64,
    /// Interval between spooler job-count probes, in milliseconds.
    pub monitor_poll_interval_ms: u64,
    /// Default row cap for queue listings.
    pub queue_view_limit: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 3,
            monitor_max_wait_ms: 120_000,
            monitor_poll_interval_ms: 2_000,
            queue_view_limit: 50,
        }
    }
}

impl QueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn monitor_max_wait(&self) -> Duration {
        Duration::from_millis(self.monitor_max_wait_ms)
    }

    pub fn monitor_poll_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_poll_interval_ms)
    }
}
