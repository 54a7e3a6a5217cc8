//! Action execution errors.

use thiserror::Error;

/// Error raised by an action.
///
/// The two variants are classified differently on the wire: a `Failure`
/// is reported verbatim, a `Fault` is reported with an `ERROR: ` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// Assertion-style failure, an expected test failure.
    #[error("{0}")]
    Failure(String),

    /// Any other fault while executing.
    #[error("{0}")]
    Fault(String),
}

impl ActionError {
    pub fn failure(message: impl Into<String>) -> Self {
        ActionError::Failure(message.into())
    }

    pub fn fault(message: impl Into<String>) -> Self {
        ActionError::Fault(message.into())
    }

    /// The raw message, without classification.
    pub fn message(&self) -> &str {
        match self {
            ActionError::Failure(m) | ActionError::Fault(m) => m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_display_is_verbatim() {
        let err = ActionError::failure("Element foo not found.");
        assert_eq!(err.to_string(), "Element foo not found.");
    }

    #[test]
    fn test_fault_message() {
        let err = ActionError::fault("TypeError: x is null");
        assert_eq!(err.message(), "TypeError: x is null");
    }

    #[test]
    fn test_error_debug() {
        let err = ActionError::failure("x");
        assert!(format!("{:?}", err).contains("Failure"));
    }
}
