//! Error types for the execution loop.

use thiserror::Error;

/// Malformed data received from the driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// First line carried no `cmd` key.
    #[error("Bad command request: {0}")]
    MissingCommand(String),

    /// 200 response with an empty body.
    #[error("Empty response from driver")]
    EmptyResponse,
}

/// Failure to encode an outcome for the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A deferred completion reached the encoder before its condition resolved.
    #[error("Outcome is still awaiting its completion condition")]
    UnresolvedOutcome,
}

/// Non-success answer from the driver endpoint.
///
/// `status` is 0 when no HTTP response was received at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Transport failure: {status} {status_text}")]
pub struct TransportFailure {
    pub status: u16,
    pub status_text: String,
}

impl TransportFailure {
    /// Connection-level failure without an HTTP status.
    pub fn connection(message: impl Into<String>) -> Self {
        Self {
            status: 0,
            status_text: message.into(),
        }
    }
}

/// Failure to parse or evaluate a restricted expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),

    #[error("Unterminated string literal")]
    UnterminatedString,

    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("Expression nested deeper than {0} levels")]
    TooDeep(usize),

    /// Error raised by a surface function.
    #[error("{0}")]
    Call(String),
}

/// Action registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Action already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Action not found: {0}")]
    NotFound(String),
}

/// Errors surfaced by the runner to its embedder.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Invalid driver endpoint.
    #[error("Invalid driver URL: {0}")]
    InvalidUrl(String),

    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(String),

    /// The run was aborted after a failure in continuation mode.
    #[error("Run aborted")]
    Aborted,

    /// The loop was cancelled from outside.
    #[error("Run cancelled")]
    Cancelled,
}

/// Result type for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;
