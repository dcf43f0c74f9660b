//! Session runtime
//!
//! Runs a [`SessionController`] on a single tokio task, the foreground
//! context. Intents arrive over a channel; the blocking start call runs on
//! the blocking pool and its completion is posted back to the same task
//! before any presentation event is emitted.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};

use super::controller::{SessionController, StartFailure};
use super::error::{SessionError, SessionResult};
use super::events::SessionEvent;
use super::state::{SessionId, SessionSnapshot, SessionSummary, StreamTarget};
use crate::provider::{BroadcastProvider, Orientation};

type Reply<T> = oneshot::Sender<SessionResult<T>>;

enum Command {
    BeginStart {
        target: StreamTarget,
        accepted: Reply<()>,
        finished: Reply<SessionId>,
    },
    RequestStop(Reply<()>),
    ConfirmStop(Reply<Option<SessionSummary>>),
    CancelStop(Reply<()>),
    ToggleMute(Reply<bool>),
    SwitchCamera(Reply<()>),
    OrientationChanged(Orientation),
    AppPaused,
    HandleBound(Arc<dyn BroadcastProvider>),
    HandleLost,
    OpenCamera(Reply<()>),
    PermissionGranted(oneshot::Sender<bool>),
    RequestOsPermission(Reply<()>),
    PermissionResolved(oneshot::Sender<bool>),
    PermissionDenied,
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Subscribe(oneshot::Sender<broadcast::Receiver<SessionEvent>>),
}

/// Completion of a background start, posted back to the session task
struct StartFinished {
    id: SessionId,
    result: Result<bool, StartFailure>,
    reply: Reply<SessionId>,
}

/// Owns the controller task
pub struct SessionRuntime;

impl SessionRuntime {
    /// Spawn the session task on the current tokio runtime
    pub fn spawn(controller: SessionController) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(64);
        tokio::spawn(run(controller, command_rx));
        SessionHandle { command_tx }
    }
}

async fn run(mut controller: SessionController, mut command_rx: mpsc::Receiver<Command>) {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<StartFinished>();

    loop {
        tokio::select! {
            command = command_rx.recv() => {
                let Some(command) = command else { break };
                handle_command(&mut controller, command, &done_tx);
            }
            Some(done) = done_rx.recv() => {
                let outcome = controller.complete_start(done.id, done.result);
                let _ = done.reply.send(outcome);
            }
        }
    }

    tracing::debug!("Session runtime stopped");
}

fn handle_command(
    controller: &mut SessionController,
    command: Command,
    done_tx: &mpsc::UnboundedSender<StartFinished>,
) {
    match command {
        Command::BeginStart {
            target,
            accepted,
            finished,
        } => match controller.request_start(target) {
            Ok(pending) => {
                let _ = accepted.send(Ok(()));
                let done_tx = done_tx.clone();
                tokio::spawn(async move {
                    let id = pending.id();
                    let result = tokio::task::spawn_blocking(move || pending.execute())
                        .await
                        .unwrap_or_else(|e| {
                            tracing::error!("Provider start task failed: {}", e);
                            Err(StartFailure::Aborted(e.to_string()))
                        });
                    let _ = done_tx.send(StartFinished {
                        id,
                        result,
                        reply: finished,
                    });
                });
            }
            Err(e) => {
                let _ = accepted.send(Err(e));
            }
        },
        Command::RequestStop(reply) => {
            let _ = reply.send(controller.request_stop());
        }
        Command::ConfirmStop(reply) => {
            let _ = reply.send(controller.confirm_stop());
        }
        Command::CancelStop(reply) => {
            let _ = reply.send(controller.cancel_stop());
        }
        Command::ToggleMute(reply) => {
            let _ = reply.send(controller.toggle_mute());
        }
        Command::SwitchCamera(reply) => {
            let _ = reply.send(controller.switch_camera());
        }
        Command::OrientationChanged(orientation) => controller.on_orientation_changed(orientation),
        Command::AppPaused => controller.on_app_paused(),
        Command::HandleBound(handle) => controller.on_handle_bound(handle),
        Command::HandleLost => controller.on_handle_lost(),
        Command::OpenCamera(reply) => {
            let _ = reply.send(controller.open_camera());
        }
        Command::PermissionGranted(reply) => {
            let _ = reply.send(controller.permission_granted());
        }
        Command::RequestOsPermission(reply) => {
            let _ = reply.send(controller.request_os_permission());
        }
        Command::PermissionResolved(reply) => {
            let _ = reply.send(controller.permission_resolved());
        }
        Command::PermissionDenied => controller.permission_denied(),
        Command::Snapshot(reply) => {
            let _ = reply.send(controller.snapshot());
        }
        Command::Subscribe(reply) => {
            let _ = reply.send(controller.subscribe());
        }
    }
}

/// A start request that has been accepted and is connecting
pub struct StartTicket {
    finished: oneshot::Receiver<SessionResult<SessionId>>,
}

impl StartTicket {
    /// Wait for the provider to answer
    pub async fn outcome(self) -> SessionResult<SessionId> {
        self.finished.await.unwrap_or(Err(SessionError::RuntimeClosed))
    }
}

/// Cloneable handle used by the presentation layer and OS glue
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    async fn send(&self, command: Command) -> SessionResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| SessionError::RuntimeClosed)
    }

    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> SessionResult<T> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx)).await?;
        rx.await.map_err(|_| SessionError::RuntimeClosed)?
    }

    async fn query<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> SessionResult<T> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx)).await?;
        rx.await.map_err(|_| SessionError::RuntimeClosed)
    }

    /// Move to `Connecting` and dispatch the provider call
    ///
    /// Returns once the transition happened; the ticket resolves when the
    /// provider answers.
    pub async fn begin_start(&self, target: StreamTarget) -> SessionResult<StartTicket> {
        let (accepted_tx, accepted_rx) = oneshot::channel();
        let (finished_tx, finished_rx) = oneshot::channel();
        self.send(Command::BeginStart {
            target,
            accepted: accepted_tx,
            finished: finished_tx,
        })
        .await?;
        accepted_rx.await.map_err(|_| SessionError::RuntimeClosed)??;
        Ok(StartTicket {
            finished: finished_rx,
        })
    }

    /// Start broadcasting and wait until live or failed
    pub async fn request_start(&self, target: StreamTarget) -> SessionResult<SessionId> {
        self.begin_start(target).await?.outcome().await
    }

    pub async fn request_stop(&self) -> SessionResult<()> {
        self.call(Command::RequestStop).await
    }

    pub async fn confirm_stop(&self) -> SessionResult<Option<SessionSummary>> {
        self.call(Command::ConfirmStop).await
    }

    pub async fn cancel_stop(&self) -> SessionResult<()> {
        self.call(Command::CancelStop).await
    }

    /// Returns the new muted flag
    pub async fn toggle_mute(&self) -> SessionResult<bool> {
        self.call(Command::ToggleMute).await
    }

    pub async fn switch_camera(&self) -> SessionResult<()> {
        self.call(Command::SwitchCamera).await
    }

    pub async fn on_orientation_changed(&self, orientation: Orientation) -> SessionResult<()> {
        self.send(Command::OrientationChanged(orientation)).await
    }

    pub async fn on_app_paused(&self) -> SessionResult<()> {
        self.send(Command::AppPaused).await
    }

    pub async fn on_handle_bound(&self, handle: Arc<dyn BroadcastProvider>) -> SessionResult<()> {
        self.send(Command::HandleBound(handle)).await
    }

    pub async fn on_handle_lost(&self) -> SessionResult<()> {
        self.send(Command::HandleLost).await
    }

    pub async fn open_camera(&self) -> SessionResult<()> {
        self.call(Command::OpenCamera).await
    }

    pub async fn permission_granted(&self) -> SessionResult<bool> {
        self.query(Command::PermissionGranted).await
    }

    pub async fn request_os_permission(&self) -> SessionResult<()> {
        self.call(Command::RequestOsPermission).await
    }

    /// Re-check permissions after the OS prompt closed
    pub async fn permission_resolved(&self) -> SessionResult<bool> {
        self.query(Command::PermissionResolved).await
    }

    pub async fn permission_denied(&self) -> SessionResult<()> {
        self.send(Command::PermissionDenied).await
    }

    pub async fn snapshot(&self) -> SessionResult<SessionSnapshot> {
        self.query(Command::Snapshot).await
    }

    /// Subscribe to presentation events
    pub async fn subscribe(&self) -> SessionResult<broadcast::Receiver<SessionEvent>> {
        self.query(Command::Subscribe).await
    }
}
