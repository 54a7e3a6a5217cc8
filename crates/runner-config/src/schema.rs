//! Configuration schema definitions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub driver: DriverConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Driver endpoint and session bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Driver endpoint polled for commands.
    #[serde(default = "default_driver_url")]
    pub url: String,

    /// Session identifier assigned by the controller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Resume a previously failed run; any further failure aborts.
    #[serde(default)]
    pub continue_run: bool,

    /// Verbose logging.
    #[serde(default)]
    pub debug: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            url: default_driver_url(),
            session_id: None,
            continue_run: false,
            debug: false,
        }
    }
}

fn default_driver_url() -> String {
    "http://localhost:4444/selenium-server/driver/".to_string()
}

/// Delays and timeouts, all in milliseconds unless noted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Delay before re-polling after a transport failure.
    #[serde(default = "default_transport_retry_ms")]
    pub transport_retry_ms: u64,

    /// Delay before replaying the previous body on `retryLast`.
    #[serde(default = "default_retry_last_delay_ms")]
    pub retry_last_delay_ms: u64,

    /// Interval between condition checks.
    #[serde(default = "default_condition_poll_ms")]
    pub condition_poll_ms: u64,

    /// Timeout of implicit condition waits.
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Client-side request timeout in seconds (0 = none; polls are long).
    #[serde(default)]
    pub request_timeout_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            transport_retry_ms: default_transport_retry_ms(),
            retry_last_delay_ms: default_retry_last_delay_ms(),
            condition_poll_ms: default_condition_poll_ms(),
            default_timeout_ms: default_timeout_ms(),
            request_timeout_secs: 0,
        }
    }
}

impl TimingConfig {
    pub fn transport_retry(&self) -> Duration {
        Duration::from_millis(self.transport_retry_ms)
    }

    pub fn retry_last_delay(&self) -> Duration {
        Duration::from_millis(self.retry_last_delay_ms)
    }

    pub fn condition_poll(&self) -> Duration {
        Duration::from_millis(self.condition_poll_ms)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// `None` when no client-side timeout is configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

fn default_transport_retry_ms() -> u64 {
    2000
}

fn default_retry_last_delay_ms() -> u64 {
    1000
}

fn default_condition_poll_ms() -> u64 {
    10
}

fn default_timeout_ms() -> u64 {
    30_000
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for rolling log files.
    #[serde(default = "default_log_dir")]
    pub dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: default_log_dir(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "~/.remote-runner/logs".to_string()
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
