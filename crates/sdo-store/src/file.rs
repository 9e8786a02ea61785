//! Checkpoint directory store
//!
//! One pretty-printed JSON document per session, `<dir>/<session_id>.json`.
//! Writes go to a temporary file first and are renamed into place, so a
//! crash mid-write leaves the previous checkpoint intact.
//!
//! Read-check-write runs under an exclusive advisory lock on
//! `<dir>/<session_id>.lock`, so stores opened on the same directory (in this
//! process or another) cannot both accept the same version. Lock files are
//! left in place after `delete`; removing one would let a waiter and a new
//! opener lock different inodes.

use crate::{check_version, validate_session_id, SessionStore, StoreError};
use async_trait::async_trait;
use fs2::FileExt;
use sdo_kernel::WorkflowState;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const EXTENSION: &str = "json";
const LOCK_EXTENSION: &str = "lock";

#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        tracing::debug!(dir = %dir.display(), "opened checkpoint store");
        Ok(Self { dir })
    }

    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: &str) -> Result<PathBuf, StoreError> {
        validate_session_id(session_id)?;
        Ok(self.dir.join(format!("{session_id}.{EXTENSION}")))
    }

    /// Block until this handle holds the session's lock; dropping the file
    /// releases it.
    async fn lock_session(&self, session_id: &str) -> Result<File, StoreError> {
        validate_session_id(session_id)?;
        let path = self.dir.join(format!("{session_id}.{LOCK_EXTENSION}"));
        let file = tokio::task::spawn_blocking(move || {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(false)
                .open(&path)?;
            file.lock_exclusive()?;
            Ok::<_, std::io::Error>(file)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("checkpoint lock task failed: {e}")))??;
        Ok(file)
    }

    async fn read(path: &Path) -> Result<Option<WorkflowState>, StoreError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn save(&self, state: &WorkflowState) -> Result<(), StoreError> {
        let path = self.path_for(&state.session_id)?;
        let bytes = serde_json::to_vec_pretty(state)?;

        let _lock = self.lock_session(&state.session_id).await?;
        let stored = Self::read(&path).await?.map(|s| s.version);
        check_version(stored, state)?;

        let tmp = path.with_extension(format!("{EXTENSION}.{}.tmp", Uuid::new_v4().simple()));
        if let Err(e) = tokio::fs::write(&tmp, &bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        tokio::fs::rename(&tmp, &path).await?;

        tracing::trace!(session_id = %state.session_id, version = state.version, "checkpoint written");
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<WorkflowState>, StoreError> {
        let path = self.path_for(session_id)?;
        Self::read(&path).await
    }

    async fn delete(&self, session_id: &str) -> Result<bool, StoreError> {
        let path = self.path_for(session_id)?;
        let _lock = self.lock_session(session_id).await?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
