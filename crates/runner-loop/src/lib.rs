//! # Runner Loop
//!
//! Command execution loop and driver protocol for the remote runner.
//!
//! The loop polls the driver for work, decodes each response into a
//! command, dispatches it through the [`ActionRegistry`], confirms deferred
//! completions with a [`ConditionWait`], and posts the encoded outcome with
//! the next poll.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use runner_loop::{
//!     register_builtins, ActionRegistry, Dispatcher, ExecutionLoop, HttpTransport, LoopConfig,
//! };
//!
//! let registry = Arc::new(ActionRegistry::new());
//! register_builtins(&registry)?;
//!
//! let url = url::Url::parse("http://localhost:4444/selenium-server/driver/")?;
//! let transport = Arc::new(HttpTransport::new(url.clone(), None)?);
//! let mut runner = ExecutionLoop::new(LoopConfig::default(), url, transport, Dispatcher::new(registry));
//! runner.run().await?;
//! ```

pub mod builtins;
pub mod codec;
pub mod condition;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod evaluator;
pub mod execution;
pub mod log_relay;
pub mod metrics;
pub mod presenter;
pub mod session;
pub mod state;
pub mod substitution;
pub mod transport;

pub use builtins::{register_builtins, Builtin};
pub use codec::{decode, encode, Decoded, Directive, Instruction};
pub use condition::{ConditionWait, WaitPredicate, WaitStatus};
pub use config::LoopConfig;
pub use dispatcher::{ActionRegistry, Dispatcher};
pub use error::{
    CodecError, EvalError, ProtocolError, RegistryError, RunnerError, RunnerResult,
    TransportFailure,
};
pub use evaluator::Evaluator;
pub use execution::ExecutionLoop;
pub use log_relay::{DriverLogLayer, LogRelay};
pub use metrics::{MetricsSnapshot, RunnerMetrics};
pub use presenter::LoggingPresenter;
pub use session::Session;
pub use state::{LoopPhase, LoopState};
pub use transport::{HttpTransport, PollRequest, Transport};
