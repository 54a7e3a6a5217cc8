//! Presentation adapter trait.

use std::fmt;
use std::str::FromStr;

use crate::command::Command;
use crate::outcome::Outcome;

/// Severity of a client-side log message, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("Invalid log level: {}", other)),
        }
    }
}

/// Receives loop notifications for local display.
///
/// Every method has a no-op default so implementors only override what
/// they render.
pub trait Presenter: Send + Sync {
    /// A command is about to be dispatched.
    fn on_command_started(&self, _command: &Command) {}

    /// A command's outcome has been resolved.
    fn on_command_complete(&self, _outcome: &Outcome) {}

    /// A command ended in an infrastructure error.
    fn on_error(&self, _message: &str) {}

    /// The controller signalled the end of the current run.
    fn on_run_complete(&self) {}

    /// The session stopped polling after a failure in continuation mode.
    fn on_aborted(&self) {}

    /// The controller set the displayed context, optionally changing the
    /// threshold below which client log messages are dropped.
    fn on_context(&self, _context: &str, _log_threshold: Option<LogLevel>) {}
}

/// Presenter that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPresenter;

impl Presenter for NoopPresenter {}
