//! Debug-mode relay of client log events to the driver.
//!
//! Each relayed event becomes a separate fire-and-forget request marked
//! `logging=true` whose body is `logLevel=<level>:<message>`. Requests are
//! queued on a bounded channel and sent by a background task over their
//! own transport, so relaying never waits on or shares the command poll.
//! When the queue is full the event is dropped.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use runner_protocols::LogLevel;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::session::{client_id, params};
use crate::transport::{PollRequest, Transport};

/// Events queued before new ones are dropped.
pub const RELAY_CAPACITY: usize = 256;

/// Targets whose events are relayed.
const RELAYED_TARGETS: [&str; 4] = [
    "runner_loop",
    "runner_config",
    "runner_protocols",
    "remote_runner",
];

tokio::task_local! {
    /// Set while the relay task sends, so its own events are not relayed.
    static RELAYING: ();
}

/// Body of one relayed log request.
pub fn log_message(level: LogLevel, message: &str) -> String {
    format!("logLevel={}:{}\n", level, message.replace(['\n', '\r'], " "))
}

/// Client log level of a tracing level. `TRACE` relays as debug.
pub fn log_level(level: &Level) -> LogLevel {
    if *level == Level::ERROR {
        LogLevel::Error
    } else if *level == Level::WARN {
        LogLevel::Warn
    } else if *level == Level::INFO {
        LogLevel::Info
    } else {
        LogLevel::Debug
    }
}

/// Handle queueing log events for the driver.
#[derive(Clone)]
pub struct LogRelay {
    tx: mpsc::Sender<String>,
    threshold: Arc<RwLock<LogLevel>>,
}

impl LogRelay {
    /// Start the background sender.
    ///
    /// Must be called within a tokio runtime. `session_id` is attached to
    /// every request when set.
    pub fn spawn(transport: Arc<dyn Transport>, session_id: Option<String>) -> Self {
        let (tx, mut rx) = mpsc::channel::<String>(RELAY_CAPACITY);

        tokio::spawn(RELAYING.scope((), async move {
            while let Some(body) = rx.recv().await {
                let request = PollRequest {
                    body,
                    params: relay_params(session_id.as_deref()),
                };
                // Nobody reads the answer; failures are dropped.
                let _ = transport.poll(&request).await;
            }
        }));

        Self {
            tx,
            threshold: Arc::new(RwLock::new(LogLevel::Debug)),
        }
    }

    pub fn threshold(&self) -> LogLevel {
        *self.threshold.read()
    }

    /// Drop messages below `level` from now on.
    pub fn set_threshold(&self, level: LogLevel) {
        *self.threshold.write() = level;
    }

    /// Queue `message` for the driver.
    ///
    /// Returns whether it was queued: messages below the threshold, and
    /// messages arriving while the queue is full, are dropped.
    pub fn relay(&self, level: LogLevel, message: &str) -> bool {
        if level < self.threshold() {
            return false;
        }
        self.tx.try_send(log_message(level, message)).is_ok()
    }

    /// Tracing layer relaying this crate family's events.
    pub fn layer(&self) -> DriverLogLayer {
        DriverLogLayer {
            relay: self.clone(),
        }
    }
}

fn relay_params(session_id: Option<&str>) -> Vec<(String, String)> {
    let mut query = vec![
        (params::LOGGING.to_string(), "true".to_string()),
        (params::UNIQUE_ID.to_string(), client_id().to_string()),
    ];
    if let Some(id) = session_id {
        query.push((params::SESSION_ID.to_string(), id.to_string()));
    }
    query.push((
        params::CACHE_BUSTER.to_string(),
        chrono::Utc::now().timestamp_millis().to_string(),
    ));
    query
}

fn is_relayed_target(target: &str) -> bool {
    RELAYED_TARGETS.iter().any(|prefix| {
        target
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    })
}

/// [`Layer`] feeding tracing events into a [`LogRelay`].
pub struct DriverLogLayer {
    relay: LogRelay,
}

impl<S: Subscriber> Layer<S> for DriverLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !is_relayed_target(metadata.target()) || RELAYING.try_with(|_| ()).is_ok() {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.relay.relay(log_level(metadata.level()), &visitor.finish());
    }
}

/// Renders an event as its message followed by `key=value` fields.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            return self.message;
        }
        let fields = self.fields.join(" ");
        if self.message.is_empty() {
            fields
        } else {
            format!("{} {}", self.message, fields)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

#[cfg(test)]
#[path = "log_relay_tests.rs"]
mod tests;
