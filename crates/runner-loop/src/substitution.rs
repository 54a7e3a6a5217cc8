//! Command argument preprocessing.
//!
//! An argument that is entirely `code{...}` (or `javascript{...}`) is
//! replaced by the string form of the evaluated expression. Otherwise
//! each `${name}` is replaced by the stored variable of that name; unknown
//! names are left as written.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use runner_protocols::{TargetSurface, VariableStore};

use crate::error::EvalError;
use crate::evaluator::Evaluator;

static CODE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^(?:code|javascript)\{(.+)\}$").expect("valid code block pattern"));

static VARIABLE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{(\w+)\}").expect("valid variable pattern"));

/// Preprocess one command argument.
pub fn preprocess(
    argument: &str,
    variables: &VariableStore,
    surface: &dyn TargetSurface,
) -> Result<String, EvalError> {
    if let Some(caps) = CODE_BLOCK.captures(argument) {
        let value = Evaluator::new(variables, surface).evaluate(&caps[1])?;
        return Ok(value.to_string());
    }
    Ok(replace_variables(argument, variables))
}

/// Replace every `${name}` that has a stored value.
pub fn replace_variables(text: &str, variables: &VariableStore) -> String {
    if !text.contains("${") {
        return text.to_string();
    }
    VARIABLE_REF
        .replace_all(text, |caps: &Captures<'_>| match variables.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
