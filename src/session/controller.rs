//! Session lifecycle controller
//!
//! Owns the broadcast state machine and is the only component allowed to
//! call mutating operations on the provider. Every method is synchronous and
//! non-blocking; the single blocking provider call (`start_broadcasting`) is
//! handed out as a [`PendingStart`] and its result fed back through
//! [`SessionController::complete_start`].

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;

use super::error::{SessionError, SessionResult};
use super::events::{ConfirmPrompt, SessionEvent};
use super::state::{
    ActiveSession, DeviceCapability, Notice, SessionId, SessionSnapshot, SessionState,
    SessionSummary, StreamTarget, ViewState, STATUS_CONNECTING, STATUS_LIVE, STATUS_READY,
};
use crate::config::StreamerConfig;
use crate::provider::{BroadcastProvider, CameraFacing, Orientation, ProviderError, RenderSurface};

/// Controller behaviour taken from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Camera opened when a provider is bound
    pub default_camera: CameraFacing,
    pub adaptive_streaming: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            default_camera: CameraFacing::Back,
            adaptive_streaming: true,
        }
    }
}

impl From<&StreamerConfig> for ControllerSettings {
    fn from(config: &StreamerConfig) -> Self {
        Self {
            default_camera: config.default_camera,
            adaptive_streaming: config.adaptive_streaming,
        }
    }
}

/// Why a dispatched start did not produce a boolean
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartFailure {
    Provider(ProviderError),
    /// The provider call panicked or its worker was cancelled
    Aborted(String),
}

/// A start request that passed every synchronous check
///
/// The controller is already in `Connecting`. Run [`PendingStart::execute`]
/// off the foreground context and pass the result to
/// [`SessionController::complete_start`].
pub struct PendingStart {
    id: SessionId,
    provider: Arc<dyn BroadcastProvider>,
    target: StreamTarget,
}

impl PendingStart {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn target(&self) -> &StreamTarget {
        &self.target
    }

    /// Perform the blocking connect-and-announce
    pub fn execute(&self) -> Result<bool, StartFailure> {
        self.provider
            .start_broadcasting(&self.target)
            .map_err(StartFailure::Provider)
    }
}

impl fmt::Debug for PendingStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingStart")
            .field("id", &self.id)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Drives one provider handle through the broadcast lifecycle
pub struct SessionController {
    /// Current session state
    state: SessionState,

    /// Bound provider, if any
    handle: Option<Arc<dyn BroadcastProvider>>,

    /// Preview surface passed to `init`
    surface: RenderSurface,

    settings: ControllerSettings,
    capability: DeviceCapability,
    view: ViewState,
    status: String,

    /// Broadcast being started or live
    active: Option<ActiveSession>,

    /// Event broadcaster
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    /// Create a controller with no provider bound
    pub fn new(surface: RenderSurface, settings: ControllerSettings) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            state: SessionState::Idle,
            handle: None,
            surface,
            capability: DeviceCapability::new(settings.default_camera),
            settings,
            view: ViewState::ReadyToRecord,
            status: STATUS_READY.to_string(),
            active: None,
            event_tx,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn capability(&self) -> &DeviceCapability {
        &self.capability
    }

    pub fn is_bound(&self) -> bool {
        self.handle.is_some()
    }

    /// Subscribe to presentation events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            view: self.view,
            status: self.status.clone(),
            capability: self.capability.clone(),
            handle_bound: self.handle.is_some(),
            session_id: self.active.as_ref().map(|a| a.id),
        }
    }

    // ----- provider binding -----

    /// A provider became available
    ///
    /// The provider is initialised once per instance; repeated bind callbacks
    /// only reopen the camera.
    pub fn on_handle_bound(&mut self, handle: Arc<dyn BroadcastProvider>) {
        match &self.handle {
            Some(existing) if Arc::ptr_eq(existing, &handle) => {
                tracing::debug!("Provider already initialised, skipping init");
            }
            Some(_) => {
                tracing::warn!("Ignoring second provider while another one is bound");
            }
            None => {
                tracing::info!("Binding provider to surface '{}'", self.surface.label);
                handle.init(&self.surface);
                handle.set_adaptive_streaming(self.settings.adaptive_streaming);
                self.handle = Some(handle);
            }
        }

        if let Some(handle) = &self.handle {
            handle.open_camera(self.settings.default_camera);
        }
    }

    /// The provider went away; nothing more may be sent to it
    pub fn on_handle_lost(&mut self) {
        if self.handle.take().is_none() {
            tracing::debug!("Provider lost while none was bound");
            return;
        }

        let previous = self.state;
        tracing::info!("Provider lost while {}", previous);
        if matches!(
            previous,
            SessionState::Live | SessionState::StoppingConfirmationPending
        ) {
            self.notify(Notice::transient("Broadcast ended: streamer disconnected"));
        }
        self.active = None;
        self.return_to_idle();
    }

    // ----- start -----

    /// Begin a broadcast to `target`
    ///
    /// Moves to `Connecting` before anything else so a second request is
    /// rejected with [`SessionError::Busy`].
    pub fn request_start(&mut self, target: StreamTarget) -> SessionResult<PendingStart> {
        self.require("start broadcasting", SessionState::Idle)?;

        self.set_state(SessionState::Connecting);
        self.set_status(STATUS_CONNECTING);

        let Some(provider) = self.handle.clone() else {
            return Err(self.fail_start(SessionError::HandleUnavailable));
        };

        if provider.is_connected() {
            return Err(self.fail_start(SessionError::SessionAlreadyActive));
        }

        let active = ActiveSession::new(target.clone());
        let id = active.id;
        self.active = Some(active);

        tracing::info!("Starting broadcast {} to {}", id, target);
        Ok(PendingStart {
            id,
            provider,
            target,
        })
    }

    /// Apply the outcome of a dispatched start
    ///
    /// Outcomes for an attempt that is no longer current (the provider was
    /// lost meanwhile) leave the state untouched.
    pub fn complete_start(
        &mut self,
        id: SessionId,
        result: Result<bool, StartFailure>,
    ) -> SessionResult<SessionId> {
        let current = self.active.as_ref().map(|a| a.id);
        if self.state != SessionState::Connecting || current != Some(id) {
            tracing::warn!("Discarding result of stale start attempt {}", id);
            return Err(SessionError::HandleUnavailable);
        }

        match result {
            Ok(true) => {
                if let Some(active) = self.active.as_mut() {
                    active.live_since = Some(Utc::now());
                }
                self.set_state(SessionState::Live);
                self.set_view(ViewState::LiveControls);
                self.set_status(STATUS_LIVE);
                tracing::info!("Broadcast {} is live", id);
                Ok(id)
            }
            Ok(false) => Err(self.fail_start(SessionError::StartRejected(
                "ingest endpoint refused the stream".to_string(),
            ))),
            Err(StartFailure::Provider(error)) => Err(self.fail_start(error.into())),
            Err(StartFailure::Aborted(reason)) => {
                Err(self.fail_start(SessionError::StartRejected(reason)))
            }
        }
    }

    fn fail_start(&mut self, error: SessionError) -> SessionError {
        tracing::warn!("Broadcast start failed: {}", error);
        self.active = None;
        self.return_to_idle();
        self.notify(Notice::persistent(error.user_message()));
        error
    }

    // ----- stop -----

    /// Ask the user to confirm ending the broadcast
    pub fn request_stop(&mut self) -> SessionResult<()> {
        self.require("stop broadcasting", SessionState::Live)?;
        self.set_state(SessionState::StoppingConfirmationPending);
        self.emit(SessionEvent::StopConfirmationRequested(ConfirmPrompt::end_live()));
        Ok(())
    }

    /// The user confirmed the stop prompt
    ///
    /// The provider stop is fire-and-forget; the stream may keep draining
    /// after the controller is back in `Idle`.
    pub fn confirm_stop(&mut self) -> SessionResult<Option<SessionSummary>> {
        self.require("confirm stop", SessionState::StoppingConfirmationPending)?;

        if let Some(handle) = &self.handle {
            handle.stop_broadcasting();
        }

        let summary = self.active.take().map(ActiveSession::finish);
        if let Some(summary) = &summary {
            tracing::info!(
                "Broadcast {} stopped after {}ms",
                summary.session_id,
                summary.duration_ms
            );
        }
        self.return_to_idle();
        Ok(summary)
    }

    /// The user dismissed the stop prompt
    pub fn cancel_stop(&mut self) -> SessionResult<()> {
        self.require("cancel stop", SessionState::StoppingConfirmationPending)?;
        self.set_state(SessionState::Live);
        Ok(())
    }

    // ----- live controls -----

    /// Flip the microphone mute; returns the new muted flag
    pub fn toggle_mute(&mut self) -> SessionResult<bool> {
        self.require("toggle mute", SessionState::Live)?;
        let handle = self.handle.as_ref().ok_or(SessionError::HandleUnavailable)?;

        let muted = !self.capability.audio_muted;
        handle.set_audio_enabled(!muted);
        self.capability.audio_muted = muted;
        self.emit(SessionEvent::MuteIconChanged(muted));
        Ok(muted)
    }

    /// Switch between front and back camera
    ///
    /// Best effort: the provider may silently keep the current camera under
    /// contention. There is no retry.
    pub fn switch_camera(&mut self) -> SessionResult<()> {
        self.require("switch camera", SessionState::Live)?;
        let handle = self.handle.as_ref().ok_or(SessionError::HandleUnavailable)?;

        handle.change_camera();
        self.capability.camera_facing = self.capability.camera_facing.flipped();
        tracing::debug!("Requested camera switch to {:?}", self.capability.camera_facing);
        Ok(())
    }

    // ----- device lifecycle -----

    /// Device rotated
    pub fn on_orientation_changed(&mut self, orientation: Orientation) {
        self.capability.orientation = orientation;
        if !orientation.is_streamable() {
            tracing::debug!("Ignoring orientation {:?}", orientation);
            return;
        }
        if let Some(handle) = &self.handle {
            handle.set_display_orientation(orientation);
        }
    }

    /// App left the foreground. Pauses the stream but keeps the session.
    pub fn on_app_paused(&mut self) {
        match &self.handle {
            Some(handle) => {
                tracing::debug!("Pausing provider while {}", self.state);
                handle.pause();
            }
            None => tracing::debug!("App paused with no provider bound"),
        }
    }

    // ----- permission support -----

    /// Open the default camera
    pub fn open_camera(&mut self) -> SessionResult<()> {
        let handle = self.handle.as_ref().ok_or(SessionError::HandleUnavailable)?;
        handle.open_camera(self.settings.default_camera);
        Ok(())
    }

    /// Whether the provider reports camera and microphone access
    ///
    /// Without a provider nothing can be granted.
    pub fn permission_granted(&mut self) -> bool {
        let granted = self
            .handle
            .as_ref()
            .map(|h| h.is_permission_granted())
            .unwrap_or(false);
        self.capability.camera_permission = granted;
        self.capability.microphone_permission = granted;
        granted
    }

    /// Show the OS permission prompt through the provider
    pub fn request_os_permission(&mut self) -> SessionResult<()> {
        if self.state != SessionState::AwaitingDeviceAccess {
            self.require("request permission", SessionState::Idle)?;
        }
        let handle = self.handle.clone().ok_or(SessionError::HandleUnavailable)?;

        self.set_state(SessionState::AwaitingDeviceAccess);
        handle.request_permission();
        Ok(())
    }

    /// The OS permission prompt was answered
    pub fn permission_resolved(&mut self) -> bool {
        let granted = self.permission_granted();
        if self.state == SessionState::AwaitingDeviceAccess {
            self.set_state(SessionState::Idle);
        }
        granted
    }

    /// Permissions are permanently denied and the user was sent to settings
    pub fn permission_denied(&mut self) {
        self.capability.camera_permission = false;
        self.capability.microphone_permission = false;
        self.notify(Notice::persistent(SessionError::PermissionDenied.user_message()));
        self.emit(SessionEvent::SettingsRedirect);
    }

    // ----- helpers -----

    fn require(&self, operation: &'static str, expected: SessionState) -> SessionResult<()> {
        match self.state {
            state if state == expected => Ok(()),
            SessionState::Connecting => {
                tracing::warn!("Rejecting '{}' while a start is in flight", operation);
                Err(SessionError::Busy)
            }
            state => {
                tracing::warn!("Rejecting '{}' while {}", operation, state);
                Err(SessionError::InvalidState { operation, state })
            }
        }
    }

    fn return_to_idle(&mut self) {
        let was_muted = self.capability.audio_muted;
        self.capability.reset_session_flags(self.settings.default_camera);
        if was_muted {
            self.emit(SessionEvent::MuteIconChanged(false));
        }
        self.set_state(SessionState::Idle);
        self.set_view(ViewState::ReadyToRecord);
        self.set_status(STATUS_READY);
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state != next {
            tracing::debug!("Session state: {} -> {}", self.state, next);
            self.state = next;
            self.emit(SessionEvent::StateChanged(next));
        }
    }

    fn set_view(&mut self, view: ViewState) {
        if self.view != view {
            self.view = view;
            self.emit(SessionEvent::ViewChanged(view));
        }
    }

    fn set_status(&mut self, status: &str) {
        if self.status != status {
            self.status = status.to_string();
            self.emit(SessionEvent::StatusChanged(self.status.clone()));
        }
    }

    fn notify(&self, notice: Notice) {
        self.emit(SessionEvent::Notice(notice));
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}
