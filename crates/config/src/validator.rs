//! Validation for `ExchangeCoreConfig`.

use crate::ExchangeCoreConfig;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    #[error("exchange name is required")]
    MissingExchangeName,

    #[error("commit_timeout_ms must be positive")]
    InvalidCommitTimeout,

    #[error("metrics_port must be nonzero")]
    InvalidMetricsPort,

    #[error("log_level '{0}' is not a valid tracing filter directive")]
    InvalidLogLevel(String),
}

/// Accumulates every validation failure instead of stopping at the first,
/// so a misconfigured deployment sees the whole list at once.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn validate(config: &ExchangeCoreConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    if config.exchange_name.trim().is_empty() {
        report.add_error(ValidationError::MissingExchangeName);
    }

    if config.commit_timeout_ms == 0 {
        report.add_error(ValidationError::InvalidCommitTimeout);
    }

    if config.metrics_port == 0 {
        report.add_error(ValidationError::InvalidMetricsPort);
    }

    if config.log_level.trim().is_empty() {
        report.add_error(ValidationError::InvalidLogLevel(config.log_level.clone()));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::generate_default_config;

    #[test]
    fn default_config_is_valid() {
        let config = generate_default_config();
        let report = validate(&config);
        assert!(report.is_valid(), "errors: {:?}", report.errors);
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut config = generate_default_config();
        config.exchange_name = "".to_string();
        let report = validate(&config);
        assert!(!report.is_valid());
    }

    #[test]
    fn zero_commit_timeout_is_rejected() {
        let mut config = generate_default_config();
        config.commit_timeout_ms = 0;
        let report = validate(&config);
        assert!(matches!(
            report.errors[0],
            ValidationError::InvalidCommitTimeout
        ));
    }
}
