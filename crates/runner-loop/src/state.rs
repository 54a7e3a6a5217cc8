//! Execution loop states.

use runner_protocols::{Command, Outcome};
use serde::{Deserialize, Serialize};

use crate::condition::ConditionWait;

/// State of the execution loop, with the data each state carries.
#[derive(Debug, Clone)]
pub enum LoopState {
    /// Not started.
    Idle,
    /// Posting the pending result and waiting for the next instruction.
    Requesting,
    /// A decoded command is about to run.
    Dispatching(Command),
    /// A deferred completion is being confirmed.
    AwaitingCondition(ConditionWait),
    /// An outcome is ready to report.
    Reporting(Outcome),
    /// The driver ended the run.
    Complete,
    /// Terminal: a failure occurred in continuation mode.
    Aborted,
}

impl LoopState {
    pub fn phase(&self) -> LoopPhase {
        match self {
            LoopState::Idle => LoopPhase::Idle,
            LoopState::Requesting => LoopPhase::Requesting,
            LoopState::Dispatching(_) => LoopPhase::Dispatching,
            LoopState::AwaitingCondition(_) => LoopPhase::AwaitingCondition,
            LoopState::Reporting(_) => LoopPhase::Reporting,
            LoopState::Complete => LoopPhase::Complete,
            LoopState::Aborted => LoopPhase::Aborted,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopState::Aborted)
    }
}

/// Data-free view of [`LoopState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoopPhase {
    Idle,
    Requesting,
    Dispatching,
    AwaitingCondition,
    Reporting,
    Complete,
    Aborted,
}

impl std::fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopPhase::Idle => write!(f, "idle"),
            LoopPhase::Requesting => write!(f, "requesting"),
            LoopPhase::Dispatching => write!(f, "dispatching"),
            LoopPhase::AwaitingCondition => write!(f, "awaiting_condition"),
            LoopPhase::Reporting => write!(f, "reporting"),
            LoopPhase::Complete => write!(f, "complete"),
            LoopPhase::Aborted => write!(f, "aborted"),
        }
    }
}
