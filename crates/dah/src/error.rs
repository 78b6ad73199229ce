//! Error types for DICOM Application Hosting operations

use thiserror::Error;

use crate::codec::Fault;
use crate::types::State;

/// Result type alias for hosting operations
pub type Result<T> = std::result::Result<T, DahError>;

/// Error types that can occur while talking to, or serving, a hosting peer
#[derive(Error, Debug)]
pub enum DahError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Remote fault: {0}")]
    Fault(Fault),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: State, to: State },

    #[error("Duplicate registration: {0}")]
    DuplicateRegistration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DahError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a new codec error
    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this error is local to one call and the peer may be retried
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DahError::Network(_) | DahError::Transport(_))
    }
}

impl From<serde_json::Error> for DahError {
    fn from(err: serde_json::Error) -> Self {
        DahError::Codec(err.to_string())
    }
}

impl From<reqwest::Error> for DahError {
    fn from(err: reqwest::Error) -> Self {
        DahError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_recoverable() {
        assert!(DahError::transport("connection refused").is_recoverable());
        assert!(!DahError::codec("bad shape").is_recoverable());
        assert!(!DahError::InvalidTransition {
            from: State::Exit,
            to: State::Completed
        }
        .is_recoverable());
    }

    #[test]
    fn invalid_transition_message_names_states() {
        let err = DahError::InvalidTransition {
            from: State::Idle,
            to: State::Completed,
        };
        assert_eq!(
            err.to_string(),
            "Invalid state transition from IDLE to COMPLETED"
        );
    }
}
