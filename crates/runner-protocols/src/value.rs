//! Values produced by the restricted expression evaluator.

use serde::{Deserialize, Serialize};

/// A dynamically typed expression value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptValue {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
}

impl ScriptValue {
    /// Truthiness: `null`, `false`, `0`, `NaN` and `""` are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            ScriptValue::Null => false,
            ScriptValue::Bool(b) => *b,
            ScriptValue::Number(n) => *n != 0.0 && !n.is_nan(),
            ScriptValue::Str(s) => !s.is_empty(),
        }
    }

    /// Numeric view of the value, if it has one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScriptValue::Number(n) => Some(*n),
            ScriptValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            ScriptValue::Str(s) => s.trim().parse().ok(),
            ScriptValue::Null => None,
        }
    }
}

impl From<&str> for ScriptValue {
    fn from(s: &str) -> Self {
        ScriptValue::Str(s.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(s: String) -> Self {
        ScriptValue::Str(s)
    }
}

impl From<bool> for ScriptValue {
    fn from(b: bool) -> Self {
        ScriptValue::Bool(b)
    }
}

impl From<f64> for ScriptValue {
    fn from(n: f64) -> Self {
        ScriptValue::Number(n)
    }
}

impl std::fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptValue::Null => write!(f, "null"),
            ScriptValue::Bool(b) => write!(f, "{}", b),
            ScriptValue::Number(n) if n.is_nan() => write!(f, "NaN"),
            ScriptValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            ScriptValue::Number(n) => write!(f, "{}", n),
            ScriptValue::Str(s) => write!(f, "{}", s),
        }
    }
}
