//! Store error types

/// Session persistence failures.
///
/// None of these leave a partially written snapshot behind: a failed save
/// means the previous snapshot is still the committed one.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another writer committed first
    #[error("stale write for session {session_id}: stored version {stored}, incoming {incoming}")]
    Conflict {
        session_id: String,
        stored: u64,
        incoming: u64,
    },

    /// Session id cannot be used as a storage key
    #[error("invalid session id: {0:?}")]
    InvalidSessionId(String),

    /// Backing storage not reachable
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether re-issuing the whole call may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Io(_) | Self::Conflict { .. })
    }
}
