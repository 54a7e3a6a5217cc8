//! Configuration loader.

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConfigError;
use crate::schema::Config;

/// `${VAR}` or `${VAR:-fallback}`.
static ENV_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("valid env reference pattern")
});

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a file, or fall back to defaults when the
    /// file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::NotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`, with an
    /// optional `${VAR:-fallback}` used when the variable is unset.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = String::with_capacity(content.len());
        let mut last = 0;

        for cap in ENV_REF.captures_iter(content) {
            let Some(whole) = cap.get(0) else {
                continue;
            };
            let var_name = &cap[1];
            let value = match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => match cap.get(2) {
                    Some(fallback) => fallback.as_str().to_string(),
                    None => return Err(ConfigError::EnvVarNotSet(var_name.to_string())),
                },
            };
            result.push_str(&content[last..whole.start()]);
            result.push_str(&value);
            last = whole.end();
        }
        result.push_str(&content[last..]);

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.remote-runner`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.timing.transport_retry_ms, 2000);
    }

    #[test]
    fn test_load_driver_section() {
        let content = r#"
            [driver]
            url = "http://grid.local:4444/selenium-server/driver/"
            session_id = "s-1"
            continue_run = true
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.driver.url, "http://grid.local:4444/selenium-server/driver/");
        assert_eq!(config.driver.session_id.as_deref(), Some("s-1"));
        assert!(config.driver.continue_run);
    }

    #[test]
    fn test_load_timing_section() {
        let content = r#"
            [timing]
            transport_retry_ms = 100
            default_timeout_ms = 5000
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.timing.transport_retry_ms, 100);
        assert_eq!(config.timing.default_timeout_ms, 5000);
        assert_eq!(config.timing.condition_poll_ms, 10);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[logging]").unwrap();
        writeln!(file, "level = \"debug\"").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/runner.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = ConfigLoader::load_or_default(Path::new("/nonexistent/runner.toml")).unwrap();
        assert_eq!(config.timing.default_timeout_ms, 30_000);
    }

    #[test]
    fn test_shipped_config_parses() {
        let content = include_str!("../../../config/default.toml");
        let config = ConfigLoader::load_str(content).unwrap();
        assert!(config.driver.url.starts_with("http"));
        assert_eq!(config.timing.retry_last_delay_ms, 1000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: This test runs in isolation and sets a unique test-only env var
        unsafe {
            std::env::set_var("RUNNER_TEST_DRIVER_HOST", "grid.internal");
        }
        let content = "url = \"http://${RUNNER_TEST_DRIVER_HOST}/driver/\"";
        let expanded = ConfigLoader::expand_env_vars(content).unwrap();
        assert_eq!(expanded, "url = \"http://grid.internal/driver/\"");
        unsafe {
            std::env::remove_var("RUNNER_TEST_DRIVER_HOST");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${RUNNER_NONEXISTENT_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(name)) if name == "RUNNER_NONEXISTENT_VAR_12345"));
    }

    #[test]
    fn test_expand_env_vars_fallback() {
        let content = "level = \"${RUNNER_NONEXISTENT_LEVEL_999:-warn}\"";
        let expanded = ConfigLoader::expand_env_vars(content).unwrap();
        assert_eq!(expanded, "level = \"warn\"");
    }

    #[test]
    fn test_expand_env_vars_no_vars() {
        let content = "value = \"no variables here\"";
        let expanded = ConfigLoader::expand_env_vars(content).unwrap();
        assert_eq!(expanded, content);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = ConfigLoader::expand_path("~/logs");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("/logs"));
    }

    #[test]
    fn test_expand_path_no_tilde() {
        assert_eq!(ConfigLoader::expand_path("/var/log/runner"), "/var/log/runner");
    }
}
