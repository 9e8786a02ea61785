//! Orchestrator configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! default_max_revisions = 3
//! call_timeout_secs = 120
//! revision_policy = "cumulative"
//! skip_policy = "blocks"
//!
//! [store]
//! kind = "file"
//! checkpoint_dir = ".sdo/checkpoints"
//! cache_capacity = 256
//!
//! [models]
//! draft = ["gemini-2.5-flash", "gemini-2.0-flash"]
//! review = ["gemini-2.5-flash"]
//!
//! [models.deprecations]
//! "gemini-2.0-flash" = "2026-03-31"
//! ```

use chrono::NaiveDate;
use sdo_kernel::{RevisionPolicy, SessionPolicy, SkipPolicy};
use sdo_store::{CachedStore, FileStore, MemoryStore, SessionStore, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Configuration loading failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot render TOML: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Revision budget for sessions that do not set their own
    pub default_max_revisions: u32,
    /// Bound on each generator or critic call
    pub call_timeout_secs: u64,
    /// Upper bound on advances per `run_until_suspended`
    pub max_steps: usize,
    pub revision_policy: RevisionPolicy,
    pub skip_policy: SkipPolicy,
    pub store: StoreConfig,
    pub models: ModelsConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_max_revisions: 3,
            call_timeout_secs: 120,
            max_steps: 512,
            revision_policy: RevisionPolicy::default(),
            skip_policy: SkipPolicy::default(),
            store: StoreConfig::default(),
            models: ModelsConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_revisions(mut self, max: u32) -> Self {
        self.default_max_revisions = max;
        self
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_secs = timeout.as_secs().max(1);
        self
    }

    #[must_use]
    pub fn with_max_steps(mut self, steps: usize) -> Self {
        self.max_steps = steps;
        self
    }

    #[must_use]
    pub fn with_revision_policy(mut self, policy: RevisionPolicy) -> Self {
        self.revision_policy = policy;
        self
    }

    #[must_use]
    pub fn with_skip_policy(mut self, policy: SkipPolicy) -> Self {
        self.skip_policy = policy;
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    #[inline]
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Policy applied to sessions that do not override it
    #[inline]
    #[must_use]
    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            revision: self.revision_policy,
            skip: self.skip_policy,
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.call_timeout_secs == 0 {
            return Err(ConfigError::Invalid("call_timeout_secs must be positive".into()));
        }
        if self.max_steps == 0 {
            return Err(ConfigError::Invalid("max_steps must be positive".into()));
        }
        if self.models.draft.is_empty() || self.models.review.is_empty() {
            return Err(ConfigError::Invalid("every model task needs at least one tier".into()));
        }
        if self.store.kind == StoreKind::File && self.store.checkpoint_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("file store needs a checkpoint_dir".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    #[default]
    Memory,
    File,
}

/// `[store]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub checkpoint_dir: PathBuf,
    /// Sessions kept in the read-through cache; 0 disables it
    pub cache_capacity: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Memory,
            checkpoint_dir: PathBuf::from(".sdo/checkpoints"),
            cache_capacity: 256,
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn file(checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self {
            kind: StoreKind::File,
            checkpoint_dir: checkpoint_dir.into(),
            ..Self::default()
        }
    }

    /// Build the configured store
    pub async fn open(&self) -> Result<Arc<dyn SessionStore>, StoreError> {
        match self.kind {
            StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
            StoreKind::File => {
                let files = FileStore::open(&self.checkpoint_dir).await?;
                if self.cache_capacity == 0 {
                    Ok(Arc::new(files))
                } else {
                    Ok(Arc::new(CachedStore::new(files, self.cache_capacity)))
                }
            }
        }
    }
}

/// `[models]` table: ordered fallback tiers per task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub draft: Vec<String>,
    pub review: Vec<String>,
    /// Model name -> scheduled shutdown date
    pub deprecations: BTreeMap<String, NaiveDate>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        let tiers = vec![
            "gemini-2.5-flash".to_string(),
            "gemini-2.0-flash".to_string(),
            "gemini-1.5-flash".to_string(),
        ];
        let mut deprecations = BTreeMap::new();
        if let Some(eol) = NaiveDate::from_ymd_opt(2026, 3, 31) {
            deprecations.insert("gemini-2.0-flash".to_string(), eol);
        }
        Self {
            draft: tiers.clone(),
            review: tiers,
            deprecations,
        }
    }
}
