//! Error taxonomy shared across the rematch crates.

use thiserror::Error;

/// Errors that can occur while synchronizing a session.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No session exists with the given code.
    #[error("session not found")]
    NotFound,

    /// The guest seat is occupied by a different participant.
    #[error("session is already full")]
    SessionFull,

    /// The caller already holds an active session.
    #[error("already in an active session")]
    AlreadyInSession,

    /// A store call failed. Logged, then left for the next poll to retry
    /// rather than retried inline.
    #[error("store error: {0}")]
    Store(String),

    /// Document serialization failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The local turn belief diverged from the shared document.
    #[error("turn state diverged from the shared document")]
    DesyncDetected,

    /// The play-again negotiation stalled past every recovery attempt.
    #[error("reset negotiation deadlocked")]
    ResetDeadlock,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(SyncError::NotFound.to_string(), "session not found");
        assert_eq!(
            SyncError::SessionFull.to_string(),
            "session is already full"
        );
        assert_eq!(
            SyncError::Store("connection refused".into()).to_string(),
            "store error: connection refused"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncError>();
    }
}
