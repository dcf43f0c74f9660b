//! Camera and microphone permission handling

pub mod gate;
pub mod system;

pub use gate::{PermissionGate, PermissionOutcome};
pub use system::{
    Permission, PermissionNotice, PermissionResult, PermissionSystem, SettingsError, SettingsPage,
    PERMISSIONS_REQUEST,
};
