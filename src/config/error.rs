//! Configuration Error Types
//!
//! Specific, actionable errors for configuration loading and validation.
//! Every variant names the file or field involved so startup failures
//! can be fixed without reading source.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors with detailed context
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Configuration file not found at expected locations
    #[error("Configuration file not found. Searched paths: {searched_paths:?}")]
    ConfigFileNotFound { searched_paths: Vec<PathBuf> },

    /// Invalid YAML syntax or shape in a configuration file
    #[error("Invalid YAML in configuration file '{file_path}': {error}")]
    InvalidYaml { file_path: String, error: String },

    /// File I/O errors during configuration loading
    #[error("Failed to read configuration file '{file_path}': {error}")]
    FileReadError { file_path: String, error: String },

    /// Missing required configuration field
    #[error("Missing required configuration field '{field}' in {context}")]
    MissingRequiredField { field: String, context: String },

    /// Invalid configuration value
    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },

    /// Environment override merging errors
    #[error("Failed to merge environment overrides for '{environment}': {error}")]
    ConfigMergeError { environment: String, error: String },
}

impl ConfigurationError {
    /// Create a configuration file not found error
    pub fn config_file_not_found(searched_paths: Vec<PathBuf>) -> Self {
        Self::ConfigFileNotFound { searched_paths }
    }

    /// Create an invalid YAML error
    pub fn invalid_yaml<P: Into<String>, E: std::fmt::Display>(file_path: P, error: E) -> Self {
        Self::InvalidYaml {
            file_path: file_path.into(),
            error: error.to_string(),
        }
    }

    /// Create a file read error
    pub fn file_read_error<P: Into<String>, E: std::fmt::Display>(file_path: P, error: E) -> Self {
        Self::FileReadError {
            file_path: file_path.into(),
            error: error.to_string(),
        }
    }

    /// Create a missing required field error
    pub fn missing_required_field<F: Into<String>, C: Into<String>>(field: F, context: C) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
            context: context.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value<F: Into<String>, V: Into<String>, C: Into<String>>(
        field: F,
        value: V,
        context: C,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            context: context.into(),
        }
    }

    /// Create a merge error
    pub fn merge_error<E: Into<String>, R: std::fmt::Display>(environment: E, error: R) -> Self {
        Self::ConfigMergeError {
            environment: environment.into(),
            error: error.to_string(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigurationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_not_found_lists_searched_paths() {
        let paths = vec![
            PathBuf::from("config/analyst-config.yaml"),
            PathBuf::from("config/analyst-config.yml"),
        ];
        let error = ConfigurationError::config_file_not_found(paths);

        let message = error.to_string();
        assert!(message.contains("Configuration file not found"));
        assert!(message.contains("analyst-config.yaml"));
    }

    #[test]
    fn test_invalid_value_names_field_and_value() {
        let error = ConfigurationError::invalid_value(
            "batch.max_concurrent",
            "0",
            "must be at least 1",
        );

        let message = error.to_string();
        assert!(message.contains("Invalid value '0' for field 'batch.max_concurrent'"));
        assert!(message.contains("must be at least 1"));
    }

    #[test]
    fn test_missing_required_field_names_context() {
        let error =
            ConfigurationError::missing_required_field("delivery.recipients", "delivery settings");

        let message = error.to_string();
        assert!(message.contains("'delivery.recipients'"));
        assert!(message.contains("delivery settings"));
    }
}
