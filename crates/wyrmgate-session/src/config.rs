//! Session timing and buffer configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration shared by every session on a server.
///
/// Every field has a default, so a partial TOML table is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// A connection that delivers no bytes for this long is treated as
    /// inactive and torn down. 0 disables the check.
    pub idle_timeout_secs: u64,

    /// Upper bound on one outbound write. A stalled write is fatal for the
    /// session that issued it.
    pub write_timeout_ms: u64,

    /// Initial capacity of the per-connection receive buffer.
    pub read_buffer_size: usize,
}

impl SessionConfig {
    /// `None` when the idle check is disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 60,
            write_timeout_ms: 5_000,
            read_buffer_size: 8 * 1024,
        }
    }
}
