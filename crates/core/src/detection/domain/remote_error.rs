use std::time::Duration;

use thiserror::Error;

/// Failure of one remote classification round-trip.
#[derive(Error, Debug)]
pub enum RemoteDetectError {
    #[error("remote classification timed out after {0:?}")]
    Timeout(Duration),
    #[error("remote classification service unavailable: {0}")]
    Unavailable(String),
    #[error("remote classification throttled: {0}")]
    Throttled(String),
    #[error("remote classification rejected: {0}")]
    Rejected(String),
    #[error("malformed remote response: {0}")]
    MalformedResponse(String),
    #[error("failed to encode frame for remote classification: {0}")]
    Encode(String),
    #[error("failed to start remote client runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl RemoteDetectError {
    /// Transient failures worth another attempt. Auth, validation and
    /// malformed-response errors fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemoteDetectError::Timeout(_)
                | RemoteDetectError::Unavailable(_)
                | RemoteDetectError::Throttled(_)
        )
    }
}
