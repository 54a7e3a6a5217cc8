//! Commands handled by the runner itself.
//!
//! These cover variable storage, timeouts and the wait family. Element
//! actions are supplied by embedders through their own [`Action`]s.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use runner_protocols::{Action, ActionContext, ActionError, ActionValue, Deferral, LogLevel};

use crate::dispatcher::ActionRegistry;
use crate::error::RegistryError;

/// Timeout restored by `setTimeout` with an empty argument.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Built-in command set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Store,
    StoreExpression,
    GetExpression,
    Echo,
    SetTimeout,
    WaitForCondition,
    WaitForPageToLoad,
    SetContext,
    CaptureScreenshot,
}

impl Builtin {
    pub const ALL: [Builtin; 9] = [
        Builtin::Store,
        Builtin::StoreExpression,
        Builtin::GetExpression,
        Builtin::Echo,
        Builtin::SetTimeout,
        Builtin::WaitForCondition,
        Builtin::WaitForPageToLoad,
        Builtin::SetContext,
        Builtin::CaptureScreenshot,
    ];

    pub fn command_name(&self) -> &'static str {
        match self {
            Builtin::Store => "store",
            Builtin::StoreExpression => "storeExpression",
            Builtin::GetExpression => "getExpression",
            Builtin::Echo => "echo",
            Builtin::SetTimeout => "setTimeout",
            Builtin::WaitForCondition => "waitForCondition",
            Builtin::WaitForPageToLoad => "waitForPageToLoad",
            Builtin::SetContext => "setContext",
            Builtin::CaptureScreenshot => "captureScreenshot",
        }
    }
}

/// Register every built-in command.
pub fn register_builtins(registry: &ActionRegistry) -> Result<(), RegistryError> {
    for builtin in Builtin::ALL {
        registry.register(Arc::new(builtin))?;
    }
    Ok(())
}

/// Parse a millisecond timeout argument.
pub fn parse_timeout(text: &str) -> Result<Duration, ActionError> {
    let millis: f64 = text
        .trim()
        .parse()
        .map_err(|_| ActionError::failure(format!("Timeout is not a number: {}", text)))?;
    if !millis.is_finite() || millis < 0.0 {
        return Err(ActionError::failure(format!("Timeout is not a number: {}", text)));
    }
    Ok(Duration::from_millis(millis as u64))
}

/// Empty leaves the current log threshold unchanged.
fn parse_log_threshold(text: &str) -> Result<Option<LogLevel>, ActionError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    text.parse().map(Some).map_err(ActionError::failure)
}

/// Empty means "use the session default".
fn parse_optional_timeout(text: &str) -> Result<Option<Duration>, ActionError> {
    if text.trim().is_empty() {
        Ok(None)
    } else {
        parse_timeout(text).map(Some)
    }
}

#[async_trait]
impl Action for Builtin {
    fn name(&self) -> &str {
        self.command_name()
    }

    async fn execute(
        &self,
        ctx: &mut ActionContext<'_>,
        arg1: &str,
        arg2: &str,
    ) -> Result<ActionValue, ActionError> {
        match self {
            Builtin::Store | Builtin::StoreExpression => {
                ctx.variables.set(arg2, arg1);
                Ok(ActionValue::Passed)
            }
            Builtin::GetExpression | Builtin::Echo => Ok(ActionValue::value(arg1)),
            Builtin::SetTimeout => {
                *ctx.default_timeout = parse_optional_timeout(arg1)?.unwrap_or(DEFAULT_TIMEOUT);
                Ok(ActionValue::none())
            }
            Builtin::WaitForCondition => {
                let timeout = parse_optional_timeout(arg2)?.unwrap_or(*ctx.default_timeout);
                Ok(ActionValue::Deferred(Deferral::condition(arg1, timeout)))
            }
            Builtin::WaitForPageToLoad => {
                let timeout = parse_optional_timeout(arg1)?;
                Ok(ActionValue::Deferred(Deferral::OperationFinished { timeout }))
            }
            Builtin::SetContext => {
                let threshold = parse_log_threshold(arg2)?;
                ctx.presenter.on_context(arg1, threshold);
                Ok(ActionValue::Passed)
            }
            Builtin::CaptureScreenshot => {
                tracing::debug!(file = arg1, "Screenshot capture is not supported on this client");
                Ok(ActionValue::Passed)
            }
        }
    }
}
