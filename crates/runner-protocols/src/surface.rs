//! Target surface trait.

use crate::error::ActionError;
use crate::value::ScriptValue;

/// The live surface commands are executed against.
///
/// The loop consults it for request addressing, for confirming deferred
/// completions, and for the functions reachable from restricted
/// expressions.
pub trait TargetSurface: Send + Sync {
    /// Address of the frame commands currently act upon.
    fn frame_address(&self) -> String {
        "top".to_string()
    }

    /// Name the current window is registered under, if any.
    fn window_name(&self) -> Option<String> {
        None
    }

    /// Whether the operation most recently triggered (for example a
    /// navigation) has finished.
    fn operation_finished(&self) -> bool;

    /// Invoke a surface function from an expression.
    fn call(&self, function: &str, _args: &[ScriptValue]) -> Result<ScriptValue, ActionError> {
        Err(ActionError::fault(format!("unknown function: {}", function)))
    }
}

/// Surface with nothing attached: top frame, operations always finished.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSurface;

impl TargetSurface for NullSurface {
    fn operation_finished(&self) -> bool {
        true
    }
}
