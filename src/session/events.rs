//! Events sent from the controller to the presentation layer

use serde::{Deserialize, Serialize};

use super::state::{Notice, SessionState, ViewState};

/// Title and body of the end-live confirmation dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPrompt {
    pub title: String,
    pub message: String,
}

impl ConfirmPrompt {
    pub fn end_live() -> Self {
        Self {
            title: "End Live".to_string(),
            message: "Are you sure you want to end the live broadcast?".to_string(),
        }
    }
}

/// Events emitted while the session changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum SessionEvent {
    StateChanged(SessionState),
    ViewChanged(ViewState),
    /// Transient progress text
    StatusChanged(String),
    /// New muted flag; the mute icon follows it
    MuteIconChanged(bool),
    Notice(Notice),
    StopConfirmationRequested(ConfirmPrompt),
    /// The user was sent to the OS settings to grant permissions
    SettingsRedirect,
}
