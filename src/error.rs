//! Error types and handling for the `AgroTech` advisor

use thiserror::Error;

/// Main error type for the `AgroTech` application
#[derive(Error, Debug)]
pub enum AgroTechError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Weather API communication errors
    #[error("API error: {message}")]
    Api { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// CSV dataset loading or parsing errors
    #[error("Dataset error: {message}")]
    Dataset { message: String },

    /// Cache operation errors
    #[error("Cache error: {message}")]
    Cache { message: String },
}

impl AgroTechError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new dataset error
    pub fn dataset<S: Into<String>>(message: S) -> Self {
        Self::Dataset {
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            AgroTechError::Config { .. } => {
                "Configuration error. Please check your config file and environment variables."
                    .to_string()
            }
            AgroTechError::Api { .. } => {
                "Unable to reach the weather service. Please check your internet connection."
                    .to_string()
            }
            AgroTechError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            AgroTechError::Dataset { message } => {
                format!("Could not use dataset: {message}")
            }
            AgroTechError::Cache { .. } => {
                "Cache operation failed. You may need to clear your cache.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = AgroTechError::config("bad threshold");
        assert!(matches!(config_err, AgroTechError::Config { .. }));

        let api_err = AgroTechError::api("connection failed");
        assert!(matches!(api_err, AgroTechError::Api { .. }));

        let validation_err = AgroTechError::validation("moisture is NaN");
        assert!(matches!(validation_err, AgroTechError::Validation { .. }));

        let dataset_err = AgroTechError::dataset("missing column");
        assert!(matches!(dataset_err, AgroTechError::Dataset { .. }));
    }

    #[test]
    fn test_user_messages() {
        let config_err = AgroTechError::config("test");
        assert!(config_err.user_message().contains("Configuration error"));

        let api_err = AgroTechError::api("test");
        assert!(api_err.user_message().contains("Unable to reach"));

        let validation_err = AgroTechError::validation("test input");
        assert!(validation_err.user_message().contains("test input"));

        let dataset_err = AgroTechError::dataset("no posto column");
        assert!(dataset_err.user_message().contains("no posto column"));
    }

    #[test]
    fn test_cache_error_hides_details() {
        let cache_err = AgroTechError::cache("decode failed: unexpected end");
        assert!(cache_err.to_string().contains("decode failed"));
        assert!(cache_err.user_message().contains("clear your cache"));
    }
}
