//! Live Streamer - session lifecycle core for a mobile RTMP broadcaster.
//!
//! Capture, encoding and the RTMP transport are done by an external provider
//! SDK. This crate owns the broadcast state machine that sits between the UI
//! and that provider: start/stop/mute/switch-camera, device lifecycle events
//! and the camera/microphone permission flow.

pub mod config;
pub mod permission;
pub mod provider;
pub mod session;
pub mod utils;

use config::StreamerConfig;
use provider::RenderSurface;
use session::{ControllerSettings, SessionController, SessionHandle, SessionRuntime};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging
///
/// `RUST_LOG` wins over the configured filter. Calling this more than once
/// keeps the first subscriber.
pub fn init_tracing(config: &StreamerConfig) {
    let result = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if result.is_ok() {
        tracing::info!("Starting Live Streamer v{}", env!("CARGO_PKG_VERSION"));
    }
}

/// Build a controller from `config` and run it on the current tokio runtime
pub fn start(config: &StreamerConfig, surface: RenderSurface) -> SessionHandle {
    let controller = SessionController::new(surface, ControllerSettings::from(config));
    SessionRuntime::spawn(controller)
}
