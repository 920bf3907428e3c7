#![forbid(unsafe_code)]

pub mod config;
pub mod content;
pub mod error;
pub mod http;
pub mod scoring;
pub mod sessions;

pub use assess_core::Clock;

pub use config::ServiceConfig;
pub use error::{ConfigError, ContentError, Rejection, ScoringError, SessionError};

pub use sessions::{
    Completion, NoticeKind, SessionCommand, SessionController, SessionHandle, SessionNotice,
    SessionPhase, SessionProgress, SessionRuntime, SessionSnapshot, ShellSignal,
};
