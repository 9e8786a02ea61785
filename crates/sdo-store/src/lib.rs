//! SDO Store - session persistence
//!
//! Snapshots of `WorkflowState` keyed by session id:
//! - `MemoryStore` for tests and single-process use
//! - `FileStore`, one JSON checkpoint per session on disk
//! - `CachedStore`, a read-through cache in front of either
//!
//! Every store enforces optimistic versioning: a snapshot is accepted only if
//! its `version` is exactly one past the stored one, so two callers racing on
//! the same session cannot silently overwrite each other.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cached;
pub mod error;
pub mod file;
pub mod memory;

pub use cached::CachedStore;
pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use sdo_kernel::WorkflowState;
use std::sync::Arc;

/// Durable key-value persistence of workflow snapshots
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a snapshot, rejecting stale versions
    async fn save(&self, state: &WorkflowState) -> Result<(), StoreError>;

    /// Load the latest snapshot, `None` if the session does not exist
    async fn load(&self, session_id: &str) -> Result<Option<WorkflowState>, StoreError>;

    /// Remove a session, returning whether it existed
    async fn delete(&self, session_id: &str) -> Result<bool, StoreError>;

    /// Ids of all stored sessions, sorted
    async fn list(&self) -> Result<Vec<String>, StoreError>;
}

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn save(&self, state: &WorkflowState) -> Result<(), StoreError> {
        (**self).save(state).await
    }

    async fn load(&self, session_id: &str) -> Result<Option<WorkflowState>, StoreError> {
        (**self).load(session_id).await
    }

    async fn delete(&self, session_id: &str) -> Result<bool, StoreError> {
        (**self).delete(session_id).await
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        (**self).list().await
    }
}

/// Accept `incoming` only if it directly follows the stored version.
///
/// A session with nothing stored accepts any version.
pub fn check_version(stored: Option<u64>, incoming: &WorkflowState) -> Result<(), StoreError> {
    match stored {
        Some(stored) if incoming.version != stored + 1 => Err(StoreError::Conflict {
            session_id: incoming.session_id.clone(),
            stored,
            incoming: incoming.version,
        }),
        _ => Ok(()),
    }
}

/// Session ids double as file names, so keep them to a safe alphabet
pub fn validate_session_id(session_id: &str) -> Result<(), StoreError> {
    let valid = !session_id.is_empty()
        && session_id.len() <= 128
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidSessionId(session_id.to_string()))
    }
}
