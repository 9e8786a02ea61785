//! Read-through snapshot cache using moka
//!
//! Loads are served from the cache when possible; saves go to the inner
//! store first and only then refresh the cache, so the cache never holds a
//! snapshot the backing store rejected.

use crate::{SessionStore, StoreError};
use async_trait::async_trait;
use moka::future::Cache;
use sdo_kernel::WorkflowState;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CachedStore<S> {
    inner: S,
    cache: Cache<String, Arc<WorkflowState>>,
}

impl<S: SessionStore> CachedStore<S> {
    /// Wrap `inner` with a cache of at most `max_capacity` sessions
    #[inline]
    #[must_use]
    pub fn new(inner: S, max_capacity: u64) -> Self {
        Self {
            inner,
            cache: Cache::new(max_capacity),
        }
    }

    /// Cache entries additionally expire after `ttl`
    #[inline]
    #[must_use]
    pub fn with_ttl(inner: S, max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    #[inline]
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Approximate number of cached sessions
    #[inline]
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl<S: SessionStore> SessionStore for CachedStore<S> {
    async fn save(&self, state: &WorkflowState) -> Result<(), StoreError> {
        if let Err(e) = self.inner.save(state).await {
            // whatever we cached may now be stale
            self.cache.invalidate(&state.session_id).await;
            return Err(e);
        }
        self.cache
            .insert(state.session_id.clone(), Arc::new(state.clone()))
            .await;
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<WorkflowState>, StoreError> {
        if let Some(hit) = self.cache.get(session_id).await {
            return Ok(Some((*hit).clone()));
        }

        let loaded = self.inner.load(session_id).await?;
        if let Some(state) = &loaded {
            self.cache
                .insert(session_id.to_string(), Arc::new(state.clone()))
                .await;
        }
        Ok(loaded)
    }

    async fn delete(&self, session_id: &str) -> Result<bool, StoreError> {
        self.cache.invalidate(session_id).await;
        self.inner.delete(session_id).await
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        self.inner.list().await
    }
}
