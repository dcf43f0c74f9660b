//! OS permission subsystem seam
//!
//! Wraps the platform's "should show rationale", permission result callback,
//! modal dialog and settings deep links.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request code used for the combined camera + microphone prompt
pub const PERMISSIONS_REQUEST: u32 = 8954;

/// Runtime permissions the broadcaster needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Camera,
    Microphone,
}

/// Answer delivered by the OS after a permission prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionResult {
    pub request_code: u32,
    pub granted: Vec<Permission>,
}

impl PermissionResult {
    /// Whether both camera and microphone were granted
    pub fn grants_all(&self) -> bool {
        [Permission::Camera, Permission::Microphone]
            .iter()
            .all(|p| self.granted.contains(p))
    }
}

/// Settings screens the user can be sent to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsPage {
    /// This app's details page
    AppDetails { uri: String },
    /// Generic application-management list
    ManageApplications,
}

impl SettingsPage {
    /// Deep link to the details page of `package`
    pub fn app_details(package: &str) -> Self {
        Self::AppDetails {
            uri: format!("package:{}", urlencoding::encode(package)),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// No activity can handle the page on this device
    #[error("settings page not available: {0:?}")]
    NotFound(SettingsPage),

    #[error("failed to open settings: {0}")]
    Failed(String),
}

/// Modal shown before sending the user to settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionNotice {
    pub title: String,
    pub message: String,
}

impl PermissionNotice {
    pub fn required() -> Self {
        Self {
            title: "Permission".to_string(),
            message: "This app does not work without camera and microphone permissions. \
                      Please enable them in settings."
                .to_string(),
        }
    }
}

/// Platform permission subsystem
#[async_trait]
pub trait PermissionSystem: Send + Sync {
    /// True unless the user permanently denied `permission`
    fn should_show_rationale(&self, permission: Permission) -> bool;

    /// Resolves when the OS delivers the result for `request_code`
    async fn await_permission_result(&self, request_code: u32) -> PermissionResult;

    /// Show `notice` and wait for the user to acknowledge it
    async fn acknowledge(&self, notice: &PermissionNotice);

    fn open_settings(&self, page: &SettingsPage) -> Result<(), SettingsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grants_all_needs_both() {
        let partial = PermissionResult {
            request_code: PERMISSIONS_REQUEST,
            granted: vec![Permission::Camera],
        };
        assert!(!partial.grants_all());

        let full = PermissionResult {
            request_code: PERMISSIONS_REQUEST,
            granted: vec![Permission::Microphone, Permission::Camera],
        };
        assert!(full.grants_all());
    }

    #[test]
    fn test_app_details_uri_is_encoded() {
        assert_eq!(
            SettingsPage::app_details("com.example.streamer"),
            SettingsPage::AppDetails {
                uri: "package:com.example.streamer".to_string()
            }
        );
        assert_eq!(
            SettingsPage::app_details("odd name"),
            SettingsPage::AppDetails {
                uri: "package:odd%20name".to_string()
            }
        );
    }
}
