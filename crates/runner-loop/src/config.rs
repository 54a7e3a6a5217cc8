//! Configuration for the execution loop.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Execution loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Delay before re-polling after a transport failure or protocol error.
    #[serde(default = "default_transport_retry")]
    pub transport_retry: Duration,

    /// Delay before replaying the previous body on `retryLast`.
    #[serde(default = "default_retry_last_delay")]
    pub retry_last_delay: Duration,

    /// Interval between condition checks.
    #[serde(default = "default_condition_poll")]
    pub condition_poll: Duration,

    /// Initial timeout of waits that do not name one.
    #[serde(default = "default_timeout")]
    pub default_timeout: Duration,

    /// Start the first run in continuation mode.
    #[serde(default)]
    pub continue_run: bool,
}

fn default_transport_retry() -> Duration {
    Duration::from_millis(2000)
}

fn default_retry_last_delay() -> Duration {
    Duration::from_millis(1000)
}

fn default_condition_poll() -> Duration {
    Duration::from_millis(10)
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            transport_retry: default_transport_retry(),
            retry_last_delay: default_retry_last_delay(),
            condition_poll: default_condition_poll(),
            default_timeout: default_timeout(),
            continue_run: false,
        }
    }
}
