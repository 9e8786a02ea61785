//! In-memory session store
//!
//! Snapshots are kept serialized so that a load always hands back an
//! independent copy, exactly as a durable store would.

use crate::{check_version, validate_session_id, SessionStore, StoreError};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sdo_kernel::WorkflowState;

#[derive(Debug, Default)]
pub struct MemoryStore {
    /// session id -> (version, JSON snapshot)
    sessions: DashMap<String, (u64, Vec<u8>)>,
}

impl MemoryStore {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn save(&self, state: &WorkflowState) -> Result<(), StoreError> {
        validate_session_id(&state.session_id)?;
        let bytes = serde_json::to_vec(state)?;

        // entry lock makes the version check and the write one step
        match self.sessions.entry(state.session_id.clone()) {
            Entry::Occupied(mut occupied) => {
                check_version(Some(occupied.get().0), state)?;
                occupied.insert((state.version, bytes));
            }
            Entry::Vacant(vacant) => {
                vacant.insert((state.version, bytes));
            }
        }
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<WorkflowState>, StoreError> {
        let Some(entry) = self.sessions.get(session_id) else {
            return Ok(None);
        };
        let state = serde_json::from_slice(&entry.value().1)?;
        Ok(Some(state))
    }

    async fn delete(&self, session_id: &str) -> Result<bool, StoreError> {
        Ok(self.sessions.remove(session_id).is_some())
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}
