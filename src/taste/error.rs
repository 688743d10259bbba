use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("session already complete: {0}")]
    SessionComplete(String),
    #[error("session still in progress: {0}")]
    SessionInProgress(String),
    #[error("expected sequence index {expected}, got {actual}")]
    SequenceMismatch { expected: u32, actual: u32 },
    #[error("unknown stimulus id: {0}")]
    UnknownStimulus(i64),
    /// The in-memory update succeeded but could not be persisted; retry the request.
    #[error("failed to persist session state: {0}")]
    StatePersistFailure(#[source] StoreError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StatePersistFailure(_))
    }
}
