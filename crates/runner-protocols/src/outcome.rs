//! Command outcomes.
//!
//! [`ActionValue`] is what an action hands back on success; the dispatcher
//! turns it (or an [`ActionError`](crate::ActionError)) into exactly one
//! [`Outcome`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How a deferred command confirms completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Deferral {
    /// Wait until the surface reports the triggered operation finished.
    /// `None` uses the session default timeout.
    OperationFinished { timeout: Option<Duration> },

    /// Wait until `expression` evaluates truthy.
    Condition { expression: String, timeout: Duration },
}

impl Deferral {
    /// Implicit deferral using the session default timeout.
    pub fn operation_finished() -> Self {
        Deferral::OperationFinished { timeout: None }
    }

    /// Explicit condition wait.
    pub fn condition(expression: impl Into<String>, timeout: Duration) -> Self {
        Deferral::Condition {
            expression: expression.into(),
            timeout,
        }
    }
}

/// Successful return of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionValue {
    /// Assertion-style success with no payload.
    Passed,
    /// Boolean result.
    Bool(bool),
    /// Ordinary value; `None` means no value.
    Value(Option<String>),
    /// Completion must be confirmed by a follow-up condition.
    Deferred(Deferral),
}

impl ActionValue {
    /// Convenience constructor for a string value.
    pub fn value(v: impl Into<String>) -> Self {
        ActionValue::Value(Some(v.into()))
    }

    /// No value.
    pub fn none() -> Self {
        ActionValue::Value(None)
    }
}

/// Classified result of one dispatched command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    ValueReturned(Option<String>),
    Failed(String),
    Errored(String),
    DeferredCompletion(Deferral),
}

impl Outcome {
    /// `Failed` or `Errored`.
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_) | Outcome::Errored(_))
    }

    /// Failure or error message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Failed(m) | Outcome::Errored(m) => Some(m),
            _ => None,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Passed => write!(f, "passed"),
            Outcome::ValueReturned(None) => write!(f, "done"),
            Outcome::ValueReturned(Some(v)) => write!(f, "done: {}", v),
            Outcome::Failed(m) => write!(f, "failed: {}", m),
            Outcome::Errored(m) => write!(f, "error: {}", m),
            Outcome::DeferredCompletion(_) => write!(f, "deferred"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_failure() {
        assert!(Outcome::Failed("x".into()).is_failure());
        assert!(Outcome::Errored("x".into()).is_failure());
        assert!(!Outcome::Passed.is_failure());
        assert!(!Outcome::ValueReturned(None).is_failure());
        assert!(!Outcome::DeferredCompletion(Deferral::operation_finished()).is_failure());
    }

    #[test]
    fn test_message() {
        assert_eq!(Outcome::Failed("nope".into()).message(), Some("nope"));
        assert_eq!(Outcome::Passed.message(), None);
    }

    #[test]
    fn test_deferral_constructors() {
        assert_eq!(
            Deferral::operation_finished(),
            Deferral::OperationFinished { timeout: None }
        );
        let d = Deferral::condition("true", Duration::from_millis(500));
        assert!(matches!(d, Deferral::Condition { ref expression, .. } if expression == "true"));
    }

    #[test]
    fn test_outcome_serialization_tagged() {
        let json = serde_json::to_value(Outcome::Failed("boom".into())).unwrap();
        assert_eq!(json["kind"], "failed");
        assert_eq!(json["detail"], "boom");
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::ValueReturned(Some("v".into())).to_string(), "done: v");
        assert_eq!(Outcome::Errored("e".into()).to_string(), "error: e");
    }
}
