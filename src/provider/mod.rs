//! Capture/transport provider seam
//!
//! The actual camera, encoder and RTMP transport live in an external SDK.
//! This module defines the trait the session controller drives, plus a mock
//! used by tests.

pub mod mock;
pub mod traits;

pub use mock::{MockProvider, ProviderCall, StartRelease};
pub use traits::{BroadcastProvider, CameraFacing, Orientation, ProviderError, RenderSurface};
