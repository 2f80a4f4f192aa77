//! Error types for session operations.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session-specific errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Key absent on get or touch
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Engine start was requested more than once
    #[error("Store engine already started")]
    AlreadyStarted,

    /// Engine stop was requested before it was started
    #[error("Store engine not started")]
    NotStarted,

    /// Engine operation attempted while disabled
    #[error("Session engine is disabled")]
    Disabled,

    /// Invalid argument, such as an empty session ID
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// I/O error from a filesystem-backed store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation attempted on a destroyed session
    #[error("Session {0} is already destroyed, renew the session before using it")]
    Destroyed(String),
}

impl SessionError {
    /// Whether this error reports a missing key.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionError::NotFound(_))
    }

    /// Whether this error came from the encoder.
    pub fn is_encoding(&self) -> bool {
        matches!(
            self,
            SessionError::Serialization(_) | SessionError::Deserialization(_)
        )
    }

    /// Whether this error came from the storage medium.
    pub fn is_backend(&self) -> bool {
        matches!(self, SessionError::Io(_) | SessionError::Backend(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(SessionError::NotFound("a".into()).is_not_found());
        assert!(SessionError::Serialization("x".into()).is_encoding());
        assert!(SessionError::Deserialization("x".into()).is_encoding());
        assert!(SessionError::Backend("disk".into()).is_backend());

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: SessionError = io.into();
        assert!(err.is_backend());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_error_display() {
        let err = SessionError::NotFound("abc".to_string());
        assert_eq!(err.to_string(), "Session not found: abc");

        let err = SessionError::Destroyed("abc".to_string());
        assert!(err.to_string().contains("already destroyed"));
    }
}
