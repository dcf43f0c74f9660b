//! Error types and handling
//!
//! Common error types used across the crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::session::SessionError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Error response for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        let code = match &error {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Session(e) => e.code(),
        };

        // Session errors carry their own user-facing wording
        let message = match &error {
            AppError::Session(e) => e.user_message(),
            other => other.to_string(),
        };

        ErrorResponse {
            code: code.to_string(),
            message,
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_response_uses_user_message() {
        let response = ErrorResponse::from(AppError::from(SessionError::SessionAlreadyActive));
        assert_eq!(response.code, "SESSION_ALREADY_ACTIVE");
        assert!(response.message.contains("previous broadcast"));
    }

    #[test]
    fn test_config_error_response() {
        let err = ConfigError::Invalid {
            field: "ingestUrl",
            reason: "must not be empty".to_string(),
        };
        let response = ErrorResponse::from(AppError::from(err));
        assert_eq!(response.code, "CONFIG_ERROR");
        assert!(response.message.contains("ingestUrl"));
    }
}
