//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, RelayConfig, RuntimeConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &RelayConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_runtime_config(&config.runtime)?;
    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is \"file\"",
        ));
    }

    for module in logging.filters.keys() {
        if module.trim().is_empty() || module.contains('=') {
            return Err(ConfigError::validation(format!(
                "Invalid log filter target: {module:?}"
            )));
        }
    }

    Ok(())
}

/// Validates runtime settings.
fn validate_runtime_config(runtime: &RuntimeConfig) -> ConfigResult<()> {
    if !(100..=599).contains(&runtime.panic_status) {
        return Err(ConfigError::validation(format!(
            "runtime.panic_status must be between 100 and 599, got {}",
            runtime.panic_status
        )));
    }

    Ok(())
}
