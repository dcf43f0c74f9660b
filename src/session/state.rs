//! Session state management
//!
//! Defines the broadcast state machine states and the data owned by a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::provider::{CameraFacing, Orientation};

/// Status text shown while idle
pub const STATUS_READY: &str = "Ready";

/// Status text shown while the start request is in flight
pub const STATUS_CONNECTING: &str = "Connecting...";

/// Status text shown while broadcasting
pub const STATUS_LIVE: &str = "LIVE";

/// Current state of the broadcast session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// Nothing in flight, ready to start
    Idle,
    /// Waiting on camera/microphone permission
    AwaitingDeviceAccess,
    /// Start request dispatched, waiting for the provider
    Connecting,
    /// Broadcasting
    Live,
    /// User asked to stop, confirmation prompt is showing
    StoppingConfirmationPending,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::AwaitingDeviceAccess => "awaiting device access",
            SessionState::Connecting => "connecting",
            SessionState::Live => "live",
            SessionState::StoppingConfirmationPending => "stopping (confirmation pending)",
        };
        f.write_str(name)
    }
}

/// Which set of controls the presentation layer shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewState {
    ReadyToRecord,
    LiveControls,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::ReadyToRecord
    }
}

/// Ingest endpoint address, e.g. `rtmp://host/app/stream-key`
///
/// Opaque to the controller; only the provider interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamTarget(String);

impl StreamTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Runtime device flags
///
/// `audio_muted` and `camera_facing` only mean something while live and are
/// reset whenever the session returns to idle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCapability {
    pub camera_permission: bool,
    pub microphone_permission: bool,
    pub camera_facing: CameraFacing,
    pub audio_muted: bool,
    pub orientation: Orientation,
}

impl DeviceCapability {
    pub fn new(default_facing: CameraFacing) -> Self {
        Self {
            camera_permission: false,
            microphone_permission: false,
            camera_facing: default_facing,
            audio_muted: false,
            orientation: Orientation::default(),
        }
    }

    /// Restore the per-session flags to their defaults
    pub fn reset_session_flags(&mut self, default_facing: CameraFacing) {
        self.audio_muted = false;
        self.camera_facing = default_facing;
    }
}

impl Default for DeviceCapability {
    fn default() -> Self {
        Self::new(CameraFacing::default())
    }
}

/// Identifies one attempt to go from idle to live and back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Book-keeping for the broadcast currently being started or live
#[derive(Debug, Clone)]
pub(crate) struct ActiveSession {
    pub id: SessionId,
    pub target: StreamTarget,
    pub requested_at: DateTime<Utc>,
    pub live_since: Option<DateTime<Utc>>,
}

impl ActiveSession {
    pub fn new(target: StreamTarget) -> Self {
        Self {
            id: SessionId::new(),
            target,
            requested_at: Utc::now(),
            live_since: None,
        }
    }

    /// Close the session and summarise it
    pub fn finish(self) -> SessionSummary {
        let ended_at = Utc::now();
        let started_at = self.live_since.unwrap_or(self.requested_at);
        let duration_ms = (ended_at - started_at).num_milliseconds().max(0) as u64;
        SessionSummary {
            session_id: self.id,
            target: self.target,
            started_at,
            ended_at,
            duration_ms,
        }
    }
}

/// Result of a completed broadcast
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub target: StreamTarget,
    /// When the provider reported the stream live
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// A message for the user
///
/// Persistent notices stay on screen until the user dismisses them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub message: String,
    pub persistent: bool,
}

impl Notice {
    pub fn persistent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            persistent: true,
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            persistent: false,
        }
    }
}

/// Read-only view of the controller for the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub view: ViewState,
    pub status: String,
    pub capability: DeviceCapability,
    pub handle_bound: bool,
    pub session_id: Option<SessionId>,
}
