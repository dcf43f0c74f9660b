//! Mock broadcast provider for testing without a camera or network.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::oneshot;

use super::traits::{BroadcastProvider, CameraFacing, Orientation, ProviderError, RenderSurface};
use crate::session::state::StreamTarget;

/// A single call observed by [`MockProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Init(RenderSurface),
    SetAdaptiveStreaming(bool),
    OpenCamera(CameraFacing),
    RequestPermission,
    StartBroadcasting(String),
    StopBroadcasting,
    Pause,
    ChangeCamera,
    SetAudioEnabled(bool),
    SetDisplayOrientation(Orientation),
}

enum StartScript {
    Immediate(Result<bool, ProviderError>),
    Deferred(oneshot::Receiver<Result<bool, ProviderError>>),
    Panic,
}

/// Releases a start call that was held with [`MockProvider::hold_next_start`].
pub struct StartRelease {
    tx: oneshot::Sender<Result<bool, ProviderError>>,
}

impl StartRelease {
    /// Let the held `start_broadcasting` call return `result`.
    pub fn release(self, result: Result<bool, ProviderError>) {
        let _ = self.tx.send(result);
    }
}

/// An in-memory provider that records every call.
///
/// Start results are scripted in order; once the script is exhausted every
/// start succeeds.
///
/// # Example
///
/// ```
/// use live_streamer_lib::provider::{BroadcastProvider, MockProvider, ProviderCall};
/// use live_streamer_lib::session::StreamTarget;
///
/// let mock = MockProvider::new();
/// mock.script_start(Ok(false));
///
/// let target = StreamTarget::new("rtmp://host/app/key");
/// assert_eq!(mock.start_broadcasting(&target), Ok(false));
/// assert_eq!(mock.start_count(), 1);
/// assert!(mock.calls().contains(&ProviderCall::StartBroadcasting("rtmp://host/app/key".into())));
/// ```
pub struct MockProvider {
    calls: Mutex<Vec<ProviderCall>>,
    starts: Mutex<VecDeque<StartScript>>,
    connected: AtomicBool,
    permission_granted: AtomicBool,
    disconnect_on_stop: AtomicBool,
}

impl MockProvider {
    /// Creates a provider with permissions granted and no open connection.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            starts: Mutex::new(VecDeque::new()),
            connected: AtomicBool::new(false),
            permission_granted: AtomicBool::new(true),
            disconnect_on_stop: AtomicBool::new(true),
        }
    }

    /// Queues the result of the next unscripted start call.
    pub fn script_start(&self, result: Result<bool, ProviderError>) {
        self.starts.lock().push_back(StartScript::Immediate(result));
    }

    /// Queues a start call that blocks until the returned handle is released.
    pub fn hold_next_start(&self) -> StartRelease {
        let (tx, rx) = oneshot::channel();
        self.starts.lock().push_back(StartScript::Deferred(rx));
        StartRelease { tx }
    }

    /// Queues a start call that panics, like an unexpected SDK exception.
    pub fn script_start_panic(&self) {
        self.starts.lock().push_back(StartScript::Panic);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn set_permission_granted(&self, granted: bool) {
        self.permission_granted.store(granted, Ordering::SeqCst);
    }

    /// Keep reporting a connection after stop, like a slow network still draining.
    pub fn keep_draining_after_stop(&self) {
        self.disconnect_on_stop.store(false, Ordering::SeqCst);
    }

    /// All calls observed so far, oldest first.
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().clone()
    }

    /// Number of calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&ProviderCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| predicate(c)).count()
    }

    pub fn start_count(&self) -> usize {
        self.count(|c| matches!(c, ProviderCall::StartBroadcasting(_)))
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: ProviderCall) {
        self.calls.lock().push(call);
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastProvider for MockProvider {
    fn init(&self, surface: &RenderSurface) {
        self.record(ProviderCall::Init(surface.clone()));
    }

    fn set_adaptive_streaming(&self, enabled: bool) {
        self.record(ProviderCall::SetAdaptiveStreaming(enabled));
    }

    fn open_camera(&self, facing: CameraFacing) {
        self.record(ProviderCall::OpenCamera(facing));
    }

    fn request_permission(&self) {
        self.record(ProviderCall::RequestPermission);
    }

    fn is_permission_granted(&self) -> bool {
        self.permission_granted.load(Ordering::SeqCst)
    }

    fn start_broadcasting(&self, target: &StreamTarget) -> Result<bool, ProviderError> {
        self.record(ProviderCall::StartBroadcasting(target.as_str().to_string()));

        // Release the lock before blocking or panicking
        let script = self.starts.lock().pop_front();
        let result = match script {
            None => Ok(true),
            Some(StartScript::Immediate(result)) => result,
            Some(StartScript::Deferred(rx)) => rx
                .blocking_recv()
                .unwrap_or_else(|_| Err(ProviderError::Transport("start abandoned".into()))),
            Some(StartScript::Panic) => panic!("mock provider start panicked"),
        };

        if result == Ok(true) {
            self.connected.store(true, Ordering::SeqCst);
        }
        result
    }

    fn stop_broadcasting(&self) {
        self.record(ProviderCall::StopBroadcasting);
        if self.disconnect_on_stop.load(Ordering::SeqCst) {
            self.connected.store(false, Ordering::SeqCst);
        }
    }

    fn pause(&self) {
        self.record(ProviderCall::Pause);
    }

    fn change_camera(&self) {
        self.record(ProviderCall::ChangeCamera);
    }

    fn set_audio_enabled(&self, enabled: bool) {
        self.record(ProviderCall::SetAudioEnabled(enabled));
    }

    fn set_display_orientation(&self, orientation: Orientation) {
        self.record(ProviderCall::SetDisplayOrientation(orientation));
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unscripted_start_succeeds_and_connects() {
        let mock = MockProvider::new();
        assert!(!mock.is_connected());

        let result = mock.start_broadcasting(&StreamTarget::new("rtmp://h/a/k"));
        assert_eq!(result, Ok(true));
        assert!(mock.is_connected());

        mock.stop_broadcasting();
        assert!(!mock.is_connected());
    }

    #[test]
    fn test_scripted_results_in_order() {
        let mock = MockProvider::new();
        mock.script_start(Ok(false));
        mock.script_start(Err(ProviderError::NotReady("camera".into())));

        let target = StreamTarget::new("rtmp://h/a/k");
        assert_eq!(mock.start_broadcasting(&target), Ok(false));
        assert!(matches!(
            mock.start_broadcasting(&target),
            Err(ProviderError::NotReady(_))
        ));
        assert_eq!(mock.start_broadcasting(&target), Ok(true));
        assert_eq!(mock.start_count(), 3);
    }

    #[test]
    fn test_held_start_waits_for_release() {
        let mock = std::sync::Arc::new(MockProvider::new());
        let release = mock.hold_next_start();

        let worker = {
            let mock = mock.clone();
            std::thread::spawn(move || mock.start_broadcasting(&StreamTarget::new("rtmp://h/a/k")))
        };

        release.release(Ok(true));
        assert_eq!(worker.join().unwrap(), Ok(true));
    }

    #[test]
    fn test_draining_keeps_connection() {
        let mock = MockProvider::new();
        mock.keep_draining_after_stop();
        mock.set_connected(true);
        mock.stop_broadcasting();
        assert!(mock.is_connected());
    }
}
