//! Broadcast provider trait definitions
//!
//! The provider owns the camera, microphone, encoder and RTMP transport.
//! The session controller only ever talks to it through this trait.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::state::StreamTarget;

/// Which camera the provider should capture from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    Front,
    Back,
}

impl CameraFacing {
    /// The opposite camera
    pub fn flipped(self) -> Self {
        match self {
            CameraFacing::Front => CameraFacing::Back,
            CameraFacing::Back => CameraFacing::Front,
        }
    }
}

impl Default for CameraFacing {
    fn default() -> Self {
        Self::Back
    }
}

/// Display orientation reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
    /// Square or otherwise unknown configurations
    Undefined,
}

impl Orientation {
    /// Whether the provider can rotate the outgoing stream to this orientation
    pub fn is_streamable(self) -> bool {
        matches!(self, Orientation::Portrait | Orientation::Landscape)
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::Portrait
    }
}

/// Opaque reference to the surface the provider renders its preview into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSurface {
    /// Platform surface identifier
    pub id: u64,

    /// Human-readable label, used in logs only
    pub label: String,
}

impl RenderSurface {
    pub fn new(id: u64, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}

/// Errors the provider may raise from `start_broadcasting`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider has not finished initialising its encoder or camera
    #[error("provider not ready: {0}")]
    NotReady(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Capture/transport provider
///
/// All methods except `start_broadcasting` are expected to return promptly.
/// `start_broadcasting` performs a blocking connect-and-announce against the
/// ingest endpoint and must only be called off the foreground context.
pub trait BroadcastProvider: Send + Sync {
    /// Attach the preview surface
    fn init(&self, surface: &RenderSurface);

    fn set_adaptive_streaming(&self, enabled: bool);

    fn open_camera(&self, facing: CameraFacing);

    /// Ask the OS to show its camera + microphone permission prompt
    fn request_permission(&self);

    /// Whether both camera and microphone access are granted
    fn is_permission_granted(&self) -> bool;

    /// Connect to the ingest endpoint and start pushing media.
    ///
    /// Returns `Ok(false)` when the endpoint refused the stream.
    fn start_broadcasting(&self, target: &StreamTarget) -> Result<bool, ProviderError>;

    /// Stop pushing media. May keep draining in the background.
    fn stop_broadcasting(&self);

    /// Pause the outgoing stream without tearing down the connection
    fn pause(&self);

    /// Switch to the other camera. Best effort: may silently do nothing.
    fn change_camera(&self);

    /// `true` captures microphone audio into the stream, `false` mutes it
    fn set_audio_enabled(&self, enabled: bool);

    fn set_display_orientation(&self, orientation: Orientation);

    /// Whether a connection to an ingest endpoint is still open
    fn is_connected(&self) -> bool;
}
