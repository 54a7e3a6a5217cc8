//! Action trait definition.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ActionError;
use crate::outcome::ActionValue;
use crate::presenter::Presenter;
use crate::surface::TargetSurface;
use crate::variables::VariableStore;

/// State an action may read or mutate while it runs.
pub struct ActionContext<'a> {
    /// Stored variables of the current run.
    pub variables: &'a mut VariableStore,
    /// Default timeout for implicit condition waits.
    pub default_timeout: &'a mut Duration,
    /// Surface the command acts upon.
    pub surface: &'a dyn TargetSurface,
    /// Local display of the run.
    pub presenter: &'a dyn Presenter,
}

/// Core trait for actions.
///
/// Actions are registered by name in an explicit table at startup and
/// invoked with the two (already substituted) command arguments.
#[async_trait]
pub trait Action: Send + Sync {
    /// Command name this action answers to.
    fn name(&self) -> &str;

    /// Execute the action.
    async fn execute(
        &self,
        ctx: &mut ActionContext<'_>,
        arg1: &str,
        arg2: &str,
    ) -> Result<ActionValue, ActionError>;
}
