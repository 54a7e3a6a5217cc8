//! Decoded controller command.

use serde::{Deserialize, Serialize};

/// Maximum length of a command summary shown to presenters.
const SUMMARY_LIMIT: usize = 40;

/// One command supplied by the controller.
///
/// Immutable once decoded; consumed once by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Command name used to look up the action.
    pub name: String,
    /// First argument (usually a locator), `""` when absent.
    pub arg1: String,
    /// Second argument (usually a value), `""` when absent.
    pub arg2: String,
}

impl Command {
    /// Create a new command.
    pub fn new(
        name: impl Into<String>,
        arg1: impl Into<String>,
        arg2: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            arg1: arg1.into(),
            arg2: arg2.into(),
        }
    }

    /// Short human readable form, `name(arg1, arg2)`, cut at 40 characters.
    pub fn summary(&self) -> String {
        let mut text = format!("{}(", self.name);
        if !self.arg1.is_empty() {
            text.push_str(&self.arg1);
            if !self.arg2.is_empty() {
                text.push_str(", ");
                text.push_str(&self.arg2);
            }
        }
        text.push(')');

        if text.chars().count() > SUMMARY_LIMIT {
            let mut cut: String = text.chars().take(SUMMARY_LIMIT).collect();
            cut.push_str("...");
            return cut;
        }
        text
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}|{}", self.name, self.arg1, self.arg2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_new() {
        let cmd = Command::new("click", "id=btn", "");
        assert_eq!(cmd.name, "click");
        assert_eq!(cmd.arg1, "id=btn");
        assert!(cmd.arg2.is_empty());
    }

    #[test]
    fn test_summary_without_args() {
        let cmd = Command::new("refresh", "", "");
        assert_eq!(cmd.summary(), "refresh()");
    }

    #[test]
    fn test_summary_with_both_args() {
        let cmd = Command::new("type", "q", "hello");
        assert_eq!(cmd.summary(), "type(q, hello)");
    }

    #[test]
    fn test_summary_ignores_second_arg_without_first() {
        let cmd = Command::new("type", "", "hello");
        assert_eq!(cmd.summary(), "type()");
    }

    #[test]
    fn test_summary_truncated() {
        let cmd = Command::new("type", "xpath=//div[@id='a-very-long-identifier']", "text");
        let summary = cmd.summary();
        assert!(summary.ends_with("..."));
        assert_eq!(summary.chars().count(), 43);
    }

    #[test]
    fn test_display() {
        let cmd = Command::new("open", "/", "");
        assert_eq!(cmd.to_string(), "open|/|");
    }
}
