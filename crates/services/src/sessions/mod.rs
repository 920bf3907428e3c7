mod controller;
mod progress;
mod runtime;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::{
    Completion, Effect, LoadRequest, NoticeKind, RequestToken, SessionController, SessionNotice,
    SessionPhase, ShellSignal, SubmitRequest,
};
pub use progress::{SessionProgress, SessionSnapshot};
pub use runtime::{SessionCommand, SessionHandle, SessionRuntime, TICK_PERIOD};
