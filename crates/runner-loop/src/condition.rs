//! Condition waits for deferred completions.

use std::time::Duration;

use runner_protocols::{Deferral, Outcome, TargetSurface, VariableStore};
use tokio::time::Instant;

use crate::evaluator::Evaluator;

/// What a wait is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitPredicate {
    /// The surface reports the triggered operation finished.
    OperationFinished,
    /// A restricted expression evaluates truthy.
    Expression(String),
}

/// Result of one predicate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitStatus {
    Satisfied,
    Pending,
    TimedOut,
    Failed(String),
}

/// An installed wait: `{predicate, started, timeout}`.
#[derive(Debug, Clone)]
pub struct ConditionWait {
    predicate: WaitPredicate,
    started: Instant,
    timeout: Duration,
}

impl ConditionWait {
    /// Start a wait now.
    pub fn new(predicate: WaitPredicate, timeout: Duration) -> Self {
        Self {
            predicate,
            started: Instant::now(),
            timeout,
        }
    }

    /// Install the wait described by `deferral`.
    pub fn from_deferral(deferral: &Deferral, default_timeout: Duration) -> Self {
        match deferral {
            Deferral::OperationFinished { timeout } => Self::new(
                WaitPredicate::OperationFinished,
                timeout.unwrap_or(default_timeout),
            ),
            Deferral::Condition {
                expression,
                timeout,
            } => Self::new(WaitPredicate::Expression(expression.clone()), *timeout),
        }
    }

    pub fn predicate(&self) -> &WaitPredicate {
        &self.predicate
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Evaluate the predicate once.
    ///
    /// A true predicate wins over an elapsed timeout; the wait only times out
    /// once strictly more than `timeout` has passed.
    pub fn check(&self, variables: &VariableStore, surface: &dyn TargetSurface) -> WaitStatus {
        let satisfied = match &self.predicate {
            WaitPredicate::OperationFinished => surface.operation_finished(),
            WaitPredicate::Expression(source) => {
                match Evaluator::new(variables, surface).evaluate(source) {
                    Ok(value) => value.is_truthy(),
                    Err(e) => return WaitStatus::Failed(e.to_string()),
                }
            }
        };

        if satisfied {
            WaitStatus::Satisfied
        } else if self.elapsed() > self.timeout {
            WaitStatus::TimedOut
        } else {
            WaitStatus::Pending
        }
    }

    /// Outcome for a terminal status, `None` while pending.
    pub fn resolve(&self, status: WaitStatus) -> Option<Outcome> {
        match status {
            WaitStatus::Satisfied => Some(Outcome::Passed),
            WaitStatus::TimedOut => Some(Outcome::Errored(format!(
                "timed out after {}ms",
                self.timeout.as_millis()
            ))),
            WaitStatus::Failed(message) => Some(Outcome::Errored(message)),
            WaitStatus::Pending => None,
        }
    }
}
