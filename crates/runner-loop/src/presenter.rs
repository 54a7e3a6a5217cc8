//! Presenter rendering loop notifications as tracing events.

use runner_protocols::{Command, LogLevel, Outcome, Presenter};

use crate::log_relay::LogRelay;

/// Logs every presentation callback.
///
/// With a [`LogRelay`] attached, `setContext` log thresholds apply to the
/// messages relayed to the driver.
#[derive(Clone, Default)]
pub struct LoggingPresenter {
    relay: Option<LogRelay>,
}

impl LoggingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_relay(mut self, relay: LogRelay) -> Self {
        self.relay = Some(relay);
        self
    }
}

impl Presenter for LoggingPresenter {
    fn on_command_started(&self, command: &Command) {
        tracing::info!(command = %command.summary(), "Executing");
    }

    fn on_command_complete(&self, outcome: &Outcome) {
        match outcome {
            Outcome::Failed(message) => tracing::warn!(failure = %message, "Command failed"),
            _ => tracing::info!(outcome = %outcome, "Command complete"),
        }
    }

    fn on_error(&self, message: &str) {
        tracing::error!(error = %message.replace(['\n', '\r'], " "), "Command error");
    }

    fn on_run_complete(&self) {
        tracing::info!("Run complete");
    }

    fn on_aborted(&self) {
        tracing::error!("Run aborted after failure in continuation mode");
    }

    fn on_context(&self, context: &str, log_threshold: Option<LogLevel>) {
        tracing::info!(context = %context, "Context set");
        if let (Some(relay), Some(level)) = (&self.relay, log_threshold) {
            relay.set_threshold(level);
        }
    }
}
