//! Permission gate
//!
//! Decides whether the broadcaster can open the camera, asks the OS when it
//! may, and sends the user to settings when it may not.

use serde::{Deserialize, Serialize};

use super::system::{
    Permission, PermissionNotice, PermissionSystem, SettingsPage, PERMISSIONS_REQUEST,
};
use crate::session::{SessionHandle, SessionResult};

/// How a permission check ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionOutcome {
    /// Already granted; the camera was opened
    Granted,
    /// The OS prompt was shown and answered
    PromptedOs,
    /// Permanently denied; the user was sent to settings
    RedirectedToSettings,
}

pub struct PermissionGate<S> {
    system: S,
    app_package: String,
}

impl<S: PermissionSystem> PermissionGate<S> {
    pub fn new(system: S, app_package: impl Into<String>) -> Self {
        Self {
            system,
            app_package: app_package.into(),
        }
    }

    pub fn system(&self) -> &S {
        &self.system
    }

    /// Make sure camera and microphone access are granted
    ///
    /// When the OS prompt is shown this waits for its answer and evaluates it
    /// once: the camera is opened if access was granted, and a prompt answered
    /// with "don't ask again" leads to the settings redirect. It never prompts
    /// twice in the same call.
    pub async fn ensure_permission(
        &self,
        session: &SessionHandle,
    ) -> SessionResult<PermissionOutcome> {
        if session.permission_granted().await? {
            session.open_camera().await?;
            return Ok(PermissionOutcome::Granted);
        }

        if self.may_prompt() {
            tracing::info!("Requesting camera and microphone permission");
            session.request_os_permission().await?;

            let result = self.system.await_permission_result(PERMISSIONS_REQUEST).await;
            // Leaves AwaitingDeviceAccess whatever the answer was
            let provider_granted = session.permission_resolved().await?;

            if result.request_code != PERMISSIONS_REQUEST {
                tracing::warn!(
                    "Ignoring permission result for request code {}",
                    result.request_code
                );
                return Ok(PermissionOutcome::PromptedOs);
            }

            if provider_granted && result.grants_all() {
                session.open_camera().await?;
                return Ok(PermissionOutcome::PromptedOs);
            }

            if self.may_prompt() {
                tracing::info!("Permission prompt answered without full access");
                return Ok(PermissionOutcome::PromptedOs);
            }
            tracing::warn!("Permission prompt answered with a permanent denial");
        } else {
            tracing::warn!("Permissions permanently denied");
        }

        self.redirect_to_settings(session).await
    }

    fn may_prompt(&self) -> bool {
        self.system.should_show_rationale(Permission::Camera)
            || self.system.should_show_rationale(Permission::Microphone)
    }

    async fn redirect_to_settings(
        &self,
        session: &SessionHandle,
    ) -> SessionResult<PermissionOutcome> {
        self.system.acknowledge(&PermissionNotice::required()).await;
        self.open_app_settings();
        session.permission_denied().await?;
        Ok(PermissionOutcome::RedirectedToSettings)
    }

    fn open_app_settings(&self) {
        let details = SettingsPage::app_details(&self.app_package);
        if let Err(e) = self.system.open_settings(&details) {
            tracing::warn!("{}, falling back to application list", e);
            if let Err(e) = self.system.open_settings(&SettingsPage::ManageApplications) {
                tracing::error!("Could not open any settings page: {}", e);
            }
        }
    }
}
