//! # Runner Protocols
//!
//! Core protocol definitions for the remote runner.
//! Contains the value types that cross crate boundaries and the traits
//! implemented by external collaborators - no loop logic.
//!
//! ## Core Traits
//!
//! - [`Action`] - A named, executable command handler
//! - [`TargetSurface`] - The live surface commands act upon
//! - [`Presenter`] - Receives loop notifications for local display
//!
//! ## Core Types
//!
//! - [`Command`] - One decoded controller instruction
//! - [`Outcome`] - The classified result of executing a command
//! - [`VariableStore`] - `${name}` bindings shared by all commands of a run

pub mod action;
pub mod command;
pub mod error;
pub mod outcome;
pub mod presenter;
pub mod surface;
pub mod value;
pub mod variables;

pub use action::{Action, ActionContext};
pub use command::Command;
pub use error::ActionError;
pub use outcome::{ActionValue, Deferral, Outcome};
pub use presenter::{LogLevel, NoopPresenter, Presenter};
pub use surface::{NullSurface, TargetSurface};
pub use value::ScriptValue;
pub use variables::VariableStore;
