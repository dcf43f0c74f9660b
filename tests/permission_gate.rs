//! Permission gate tests with a scripted OS permission subsystem.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use live_streamer_lib::config::StreamerConfig;
use live_streamer_lib::permission::{
    Permission, PermissionGate, PermissionNotice, PermissionOutcome, PermissionResult,
    PermissionSystem, SettingsError, SettingsPage,
};
use live_streamer_lib::provider::{CameraFacing, MockProvider, ProviderCall, RenderSurface};
use live_streamer_lib::session::{SessionError, SessionEvent, SessionHandle, SessionState};
use parking_lot::Mutex;

/// Fake OS: answers prompts by flipping the provider's permission flag.
struct ScriptedOs {
    provider: Arc<MockProvider>,
    rationale: AtomicBool,
    grant_on_prompt: bool,
    /// The user ticks "don't ask again" while denying
    deny_forever_on_prompt: bool,
    /// Answer with this request code instead of the requested one
    answer_code: Option<u32>,
    app_details_available: bool,
    prompts: AtomicUsize,
    acknowledged: AtomicUsize,
    opened: Mutex<Vec<SettingsPage>>,
}

impl ScriptedOs {
    fn new(provider: Arc<MockProvider>) -> Self {
        Self {
            provider,
            rationale: AtomicBool::new(true),
            grant_on_prompt: true,
            deny_forever_on_prompt: false,
            answer_code: None,
            app_details_available: true,
            prompts: AtomicUsize::new(0),
            acknowledged: AtomicUsize::new(0),
            opened: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PermissionSystem for ScriptedOs {
    fn should_show_rationale(&self, _permission: Permission) -> bool {
        self.rationale.load(Ordering::SeqCst)
    }

    async fn await_permission_result(&self, request_code: u32) -> PermissionResult {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.provider.set_permission_granted(self.grant_on_prompt);
        if self.deny_forever_on_prompt {
            self.rationale.store(false, Ordering::SeqCst);
        }
        PermissionResult {
            request_code: self.answer_code.unwrap_or(request_code),
            granted: if self.grant_on_prompt {
                vec![Permission::Camera, Permission::Microphone]
            } else {
                Vec::new()
            },
        }
    }

    async fn acknowledge(&self, _notice: &PermissionNotice) {
        self.acknowledged.fetch_add(1, Ordering::SeqCst);
    }

    fn open_settings(&self, page: &SettingsPage) -> Result<(), SettingsError> {
        if matches!(page, SettingsPage::AppDetails { .. }) && !self.app_details_available {
            return Err(SettingsError::NotFound(page.clone()));
        }
        self.opened.lock().push(page.clone());
        Ok(())
    }
}

async fn bound_session() -> Result<(SessionHandle, Arc<MockProvider>)> {
    let handle = live_streamer_lib::start(&StreamerConfig::default(), RenderSurface::new(3, "preview"));
    let mock = Arc::new(MockProvider::new());
    handle.on_handle_bound(mock.clone()).await?;
    handle.snapshot().await?;
    mock.clear_calls();
    Ok((handle, mock))
}

fn open_camera_calls(mock: &MockProvider) -> usize {
    mock.count(|c| *c == ProviderCall::OpenCamera(CameraFacing::Back))
}

#[tokio::test]
async fn test_granted_opens_camera_once() -> Result<()> {
    let (handle, mock) = bound_session().await?;
    let gate = PermissionGate::new(ScriptedOs::new(mock.clone()), "com.example.streamer");

    let outcome = gate.ensure_permission(&handle).await?;

    assert_eq!(outcome, PermissionOutcome::Granted);
    assert_eq!(open_camera_calls(&mock), 1);
    assert_eq!(mock.count(|c| *c == ProviderCall::RequestPermission), 0);
    assert_eq!(gate.system().prompts.load(Ordering::SeqCst), 0);

    let capability = handle.snapshot().await?.capability;
    assert!(capability.camera_permission && capability.microphone_permission);
    Ok(())
}

#[tokio::test]
async fn test_prompt_then_granted() -> Result<()> {
    let (handle, mock) = bound_session().await?;
    mock.set_permission_granted(false);
    let gate = PermissionGate::new(ScriptedOs::new(mock.clone()), "com.example.streamer");

    let outcome = gate.ensure_permission(&handle).await?;

    assert_eq!(outcome, PermissionOutcome::PromptedOs);
    assert_eq!(mock.count(|c| *c == ProviderCall::RequestPermission), 1);
    assert_eq!(open_camera_calls(&mock), 1);
    assert_eq!(handle.snapshot().await?.state, SessionState::Idle);
    Ok(())
}

#[tokio::test]
async fn test_prompt_then_denied() -> Result<()> {
    let (handle, mock) = bound_session().await?;
    mock.set_permission_granted(false);
    let mut os = ScriptedOs::new(mock.clone());
    os.grant_on_prompt = false;
    let gate = PermissionGate::new(os, "com.example.streamer");

    let outcome = gate.ensure_permission(&handle).await?;

    assert_eq!(outcome, PermissionOutcome::PromptedOs);
    assert_eq!(open_camera_calls(&mock), 0);
    assert_eq!(gate.system().prompts.load(Ordering::SeqCst), 1);

    let snapshot = handle.snapshot().await?;
    assert_eq!(snapshot.state, SessionState::Idle);
    assert!(!snapshot.capability.camera_permission);
    Ok(())
}

#[tokio::test]
async fn test_permanent_denial_redirects_to_app_settings() -> Result<()> {
    let (handle, mock) = bound_session().await?;
    mock.set_permission_granted(false);
    let mut os = ScriptedOs::new(mock.clone());
    os.rationale = AtomicBool::new(false);
    let gate = PermissionGate::new(os, "com.example.streamer");
    let mut events = handle.subscribe().await?;

    let outcome = gate.ensure_permission(&handle).await?;

    assert_eq!(outcome, PermissionOutcome::RedirectedToSettings);
    assert_eq!(gate.system().acknowledged.load(Ordering::SeqCst), 1);
    assert_eq!(
        *gate.system().opened.lock(),
        vec![SettingsPage::app_details("com.example.streamer")]
    );
    assert_eq!(mock.count(|c| *c == ProviderCall::RequestPermission), 0);

    handle.snapshot().await?;
    let mut saw_redirect = false;
    while let Ok(event) = events.try_recv() {
        saw_redirect |= event == SessionEvent::SettingsRedirect;
    }
    assert!(saw_redirect);
    Ok(())
}

#[tokio::test]
async fn test_settings_fallback_to_application_list() -> Result<()> {
    let (handle, mock) = bound_session().await?;
    mock.set_permission_granted(false);
    let mut os = ScriptedOs::new(mock.clone());
    os.rationale = AtomicBool::new(false);
    os.app_details_available = false;
    let gate = PermissionGate::new(os, "com.example.streamer");

    let outcome = gate.ensure_permission(&handle).await?;

    assert_eq!(outcome, PermissionOutcome::RedirectedToSettings);
    assert_eq!(
        *gate.system().opened.lock(),
        vec![SettingsPage::ManageApplications]
    );
    Ok(())
}

#[tokio::test]
async fn test_prompt_requires_bound_provider() -> Result<()> {
    let handle = live_streamer_lib::start(&StreamerConfig::default(), RenderSurface::new(3, "p"));
    let gate = PermissionGate::new(
        ScriptedOs::new(Arc::new(MockProvider::new())),
        "com.example.streamer",
    );

    assert_eq!(
        gate.ensure_permission(&handle).await,
        Err(SessionError::HandleUnavailable)
    );
    assert_eq!(gate.system().prompts.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_prompt_denied_forever_redirects_to_settings() -> Result<()> {
    let (handle, mock) = bound_session().await?;
    mock.set_permission_granted(false);
    let mut os = ScriptedOs::new(mock.clone());
    os.grant_on_prompt = false;
    os.deny_forever_on_prompt = true;
    let gate = PermissionGate::new(os, "com.example.streamer");

    let outcome = gate.ensure_permission(&handle).await?;

    assert_eq!(outcome, PermissionOutcome::RedirectedToSettings);
    assert_eq!(gate.system().prompts.load(Ordering::SeqCst), 1);
    assert_eq!(gate.system().acknowledged.load(Ordering::SeqCst), 1);
    assert_eq!(mock.count(|c| *c == ProviderCall::RequestPermission), 1);
    assert_eq!(
        *gate.system().opened.lock(),
        vec![SettingsPage::app_details("com.example.streamer")]
    );
    assert_eq!(open_camera_calls(&mock), 0);
    assert_eq!(handle.snapshot().await?.state, SessionState::Idle);
    Ok(())
}

#[tokio::test]
async fn test_result_for_other_request_is_ignored() -> Result<()> {
    let (handle, mock) = bound_session().await?;
    mock.set_permission_granted(false);
    let mut os = ScriptedOs::new(mock.clone());
    os.answer_code = Some(1);
    os.deny_forever_on_prompt = true;
    let gate = PermissionGate::new(os, "com.example.streamer");

    let outcome = gate.ensure_permission(&handle).await?;

    // Neither the grant nor the denial in a foreign answer is acted on
    assert_eq!(outcome, PermissionOutcome::PromptedOs);
    assert_eq!(open_camera_calls(&mock), 0);
    assert_eq!(gate.system().acknowledged.load(Ordering::SeqCst), 0);
    assert!(gate.system().opened.lock().is_empty());
    assert_eq!(handle.snapshot().await?.state, SessionState::Idle);
    Ok(())
}
