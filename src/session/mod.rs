//! Broadcast session lifecycle
//!
//! - `SessionController`: the state machine, synchronous and single-owner
//! - `SessionRuntime` / `SessionHandle`: runs the controller on one task and
//!   dispatches the blocking start to the blocking pool
//! - `SessionEvent`: what the presentation layer renders

pub mod controller;
pub mod error;
pub mod events;
pub mod runtime;
pub mod state;

pub use controller::{ControllerSettings, PendingStart, SessionController, StartFailure};
pub use error::{SessionError, SessionResult};
pub use events::{ConfirmPrompt, SessionEvent};
pub use runtime::{SessionHandle, SessionRuntime, StartTicket};
pub use state::{
    DeviceCapability, Notice, SessionId, SessionSnapshot, SessionState, SessionSummary,
    StreamTarget, ViewState,
};
