//! Command dispatch.
//!
//! Actions are looked up by command name in an explicit registration
//! table. Every dispatch yields exactly one classified [`Outcome`].

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use runner_protocols::{Action, ActionContext, ActionError, ActionValue, Command, Outcome};

use crate::error::{EvalError, RegistryError};
use crate::substitution;

/// Registry of actions by command name.
pub struct ActionRegistry {
    actions: DashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            actions: DashMap::new(),
        }
    }

    /// Register an action under its name.
    ///
    /// Returns an error if the name is already taken.
    pub fn register(&self, action: Arc<dyn Action>) -> Result<(), RegistryError> {
        match self.actions.entry(action.name().to_string()) {
            Entry::Occupied(entry) => Err(RegistryError::AlreadyRegistered(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(action);
                Ok(())
            }
        }
    }

    /// Remove the action registered under `name`.
    pub fn unregister(&self, name: &str) -> Result<(), RegistryError> {
        self.actions
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.actions.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs commands against the registry.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ActionRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ActionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ActionRegistry> {
        &self.registry
    }

    /// Preprocess the arguments, run the action and classify the result.
    pub async fn dispatch(&self, command: &Command, ctx: &mut ActionContext<'_>) -> Outcome {
        let Some(action) = self.registry.get(&command.name) else {
            return Outcome::Errored(format!("unknown command: {}", command.name));
        };

        let (arg1, arg2) = match preprocess_args(command, ctx) {
            Ok(args) => args,
            Err(e) => return Outcome::Errored(e.to_string()),
        };

        tracing::debug!(command = %command.name, arg1 = %arg1, arg2 = %arg2, "Dispatching");
        classify(action.execute(ctx, &arg1, &arg2).await)
    }
}

fn preprocess_args(
    command: &Command,
    ctx: &ActionContext<'_>,
) -> Result<(String, String), EvalError> {
    let arg1 = substitution::preprocess(&command.arg1, &*ctx.variables, ctx.surface)?;
    let arg2 = substitution::preprocess(&command.arg2, &*ctx.variables, ctx.surface)?;
    Ok((arg1, arg2))
}

/// Map an action result onto exactly one outcome.
pub fn classify(result: Result<ActionValue, ActionError>) -> Outcome {
    match result {
        Ok(ActionValue::Passed) | Ok(ActionValue::Bool(true)) => Outcome::Passed,
        Ok(ActionValue::Bool(false)) => Outcome::ValueReturned(Some("false".to_string())),
        Ok(ActionValue::Value(value)) => Outcome::ValueReturned(value),
        Ok(ActionValue::Deferred(deferral)) => Outcome::DeferredCompletion(deferral),
        Err(ActionError::Failure(message)) => Outcome::Failed(message),
        Err(ActionError::Fault(message)) => Outcome::Errored(message),
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
