//! Session error types

use thiserror::Error;

use super::state::SessionState;
use crate::provider::ProviderError;

/// Errors returned by session controller operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A start request is still in flight
    #[error("a start request is already in progress")]
    Busy,

    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// No provider is bound, or it reported it is not ready
    #[error("broadcast provider unavailable")]
    HandleUnavailable,

    /// The provider is still connected from a previous broadcast
    #[error("previous broadcast is still active")]
    SessionAlreadyActive,

    /// The provider refused to start
    #[error("broadcast start rejected: {0}")]
    StartRejected(String),

    #[error("camera or microphone permission denied")]
    PermissionDenied,

    /// The session runtime task is gone
    #[error("session runtime closed")]
    RuntimeClosed,
}

impl SessionError {
    /// Text shown to the user when this error surfaces
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Busy => "Still connecting, please wait".to_string(),
            SessionError::InvalidState { .. } => "That action is not available right now".to_string(),
            SessionError::HandleUnavailable => {
                "Streamer is not ready yet, please try again".to_string()
            }
            SessionError::SessionAlreadyActive => {
                "Your previous broadcast is still sending, likely due to a slow network".to_string()
            }
            SessionError::StartRejected(_) => {
                "Failed to start. Please check the ingest URL".to_string()
            }
            SessionError::PermissionDenied => {
                "This app cannot work without camera and microphone permissions".to_string()
            }
            SessionError::RuntimeClosed => "The streamer has shut down".to_string(),
        }
    }

    /// Stable code for front ends
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::Busy => "BUSY",
            SessionError::InvalidState { .. } => "INVALID_STATE",
            SessionError::HandleUnavailable => "HANDLE_UNAVAILABLE",
            SessionError::SessionAlreadyActive => "SESSION_ALREADY_ACTIVE",
            SessionError::StartRejected(_) => "START_REJECTED",
            SessionError::PermissionDenied => "PERMISSION_DENIED",
            SessionError::RuntimeClosed => "RUNTIME_CLOSED",
        }
    }
}

impl From<ProviderError> for SessionError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::NotReady(_) => SessionError::HandleUnavailable,
            ProviderError::Transport(reason) => SessionError::StartRejected(reason),
        }
    }
}

/// Result type alias using SessionError
pub type SessionResult<T> = Result<T, SessionError>;
