//! Error taxonomy shared by every recall crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecallError {
    /// Caller-fixable parameter problem (non-positive length, out-of-range index).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An operation arrived while the machine was in a phase that does not permit it.
    #[error("illegal state: {operation} is not allowed while {phase}")]
    IllegalState {
        operation: &'static str,
        phase: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    /// Storage failure from the result logger. Session-fatal.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecallError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        RecallError::InvalidArgument(msg.into())
    }

    pub fn illegal(operation: &'static str, phase: impl std::fmt::Display) -> Self {
        RecallError::IllegalState {
            operation,
            phase: phase.to_string(),
        }
    }

    /// True for errors that must end the running session.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, RecallError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, RecallError>;
