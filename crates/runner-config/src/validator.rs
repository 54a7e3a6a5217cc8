//! Configuration validation.

use url::Url;

use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_driver(config, &mut result);
        Self::validate_timing(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_driver(config: &Config, result: &mut ValidationResult) {
        match Url::parse(&config.driver.url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
                if !url.path().ends_with('/') {
                    result.add_warning(ValidationWarning::new(
                        "driver.url",
                        "driver path usually ends with '/'",
                    ));
                }
            }
            Ok(url) => {
                result.add_error(ValidationError::new(
                    "driver.url",
                    format!("unsupported scheme '{}'", url.scheme()),
                ));
            }
            Err(e) => {
                result.add_error(ValidationError::new("driver.url", e.to_string()));
            }
        }

        if let Some(id) = &config.driver.session_id {
            if id.trim().is_empty() {
                result.add_error(ValidationError::new(
                    "driver.session_id",
                    "session_id cannot be blank",
                ));
            }
        }
    }

    fn validate_timing(config: &Config, result: &mut ValidationResult) {
        let timing = &config.timing;

        if timing.transport_retry_ms == 0 {
            result.add_error(ValidationError::new(
                "timing.transport_retry_ms",
                "transport_retry_ms must be greater than 0",
            ));
        }

        if timing.retry_last_delay_ms == 0 {
            result.add_error(ValidationError::new(
                "timing.retry_last_delay_ms",
                "retry_last_delay_ms must be greater than 0",
            ));
        }

        if timing.condition_poll_ms == 0 {
            result.add_error(ValidationError::new(
                "timing.condition_poll_ms",
                "condition_poll_ms must be greater than 0",
            ));
        }

        if timing.default_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "timing.default_timeout_ms",
                "default_timeout_ms must be greater than 0",
            ));
        } else if timing.condition_poll_ms > timing.default_timeout_ms {
            result.add_warning(ValidationWarning::new(
                "timing.condition_poll_ms",
                "condition_poll_ms exceeds default_timeout_ms; conditions are checked at most once",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
            result.add_warning(ValidationWarning::new(
                "logging.level",
                format!(
                    "'{}' is not a plain level; it will be used as a filter directive",
                    config.logging.level
                ),
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
