//! Error types for SDO Core
//!
//! Two layers:
//! - `GenerationError` is what a collaborator (generator or critic) reports
//! - `OrchestratorError` is what a caller of the orchestrator sees
//!
//! Fatal generation failures never surface as `OrchestratorError`: they are
//! recorded in the session (`status = error`) and the state is returned.

use sdo_kernel::{GraphError, InvariantViolation, SectionId, StateMachineError, WorkflowStatus};
use sdo_store::StoreError;

/// Failure reported by a content generator or critic
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Network hiccup, timeout, quota; the same call may succeed later
    #[error("transient failure: {0}")]
    Transient(String),

    /// Malformed request, unsupported section; retrying will not help
    #[error("fatal failure: {0}")]
    Fatal(String),

    /// The caller cancelled the call
    #[error("call cancelled")]
    Cancelled,
}

impl GenerationError {
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Main orchestrator error type
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// External call failed transiently; nothing was changed
    #[error("transient failure while drafting {section}: {message}")]
    TransientGeneration { section: SectionId, message: String },

    /// Store unavailable or stale write; nothing was committed
    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),

    /// Invalid section set or dependency graph
    #[error("invalid workflow: {0}")]
    Configuration(#[from] GraphError),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session already exists: {0}")]
    SessionExists(String),

    /// Another transition on the same session is in flight
    #[error("session busy: {0}")]
    SessionBusy(String),

    /// Operation not valid in the session's current status
    #[error("cannot {operation} session {session_id} in status {status}")]
    InvalidState {
        session_id: String,
        status: WorkflowStatus,
        operation: &'static str,
    },

    #[error("unknown section: {0}")]
    UnknownSection(SectionId),

    /// Caller cancelled an in-flight external call; nothing was changed
    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    StateMachine(#[from] StateMachineError),

    /// A stored snapshot (or a transition about to be stored) breaks an invariant
    #[error("session {session_id} is inconsistent: {violation}")]
    Corrupted {
        session_id: String,
        #[source]
        violation: InvariantViolation,
    },
}

impl OrchestratorError {
    /// Whether calling the same operation again may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::TransientGeneration { .. } | Self::SessionBusy(_) => true,
            Self::Persistence(e) => e.is_retryable(),
            _ => false,
        }
    }

    #[inline]
    pub(crate) fn invalid_state(
        session_id: impl Into<String>,
        status: WorkflowStatus,
        operation: &'static str,
    ) -> Self {
        Self::InvalidState {
            session_id: session_id.into(),
            status,
            operation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_classification() {
        assert!(GenerationError::Transient("429".into()).is_retryable());
        assert!(!GenerationError::Fatal("bad".into()).is_retryable());
        assert!(!GenerationError::Cancelled.is_retryable());

        assert!(OrchestratorError::SessionBusy("s".into()).is_retryable());
        assert!(OrchestratorError::Persistence(StoreError::Unavailable("down".into())).is_retryable());
        assert!(!OrchestratorError::Configuration(GraphError::Empty).is_retryable());
        assert!(!OrchestratorError::Cancelled.is_retryable());
    }
}
