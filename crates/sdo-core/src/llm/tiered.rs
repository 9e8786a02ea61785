//! Tiered model fallback
//!
//! Each task has an ordered list of models. A call starts at tier 1 and moves
//! down only when a tier reports quota exhaustion; any other failure stops
//! the walk and is classified. Every attempt lands in the `AttemptLog`.

use super::{BackendError, ModelBackend};
use crate::config::ModelsConfig;
use crate::error::GenerationError;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTask {
    Draft,
    Review,
}

impl fmt::Display for ModelTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Draft => "draft",
            Self::Review => "review",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    /// Fell through to the next tier
    QuotaExhausted(String),
    /// Stopped the walk
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub timestamp: DateTime<Utc>,
    pub task: ModelTask,
    pub model: String,
    /// 1-based position in the tier list
    pub tier: usize,
    pub outcome: AttemptOutcome,
}

/// Append-only record of model attempts
#[derive(Debug, Default)]
pub struct AttemptLog {
    inner: Mutex<Vec<AttemptRecord>>,
}

impl AttemptLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, task: ModelTask, model: &str, tier: usize, outcome: AttemptOutcome) {
        self.inner.lock().push(AttemptRecord {
            timestamp: Utc::now(),
            task,
            model: model.to_string(),
            tier,
            outcome,
        });
    }

    #[must_use]
    pub fn records(&self) -> Vec<AttemptRecord> {
        self.inner.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[derive(Debug)]
pub struct TieredModel<B> {
    backend: B,
    models: ModelsConfig,
    attempts: AttemptLog,
}

impl<B: ModelBackend> TieredModel<B> {
    #[must_use]
    pub fn new(backend: B, models: ModelsConfig) -> Self {
        Self {
            backend,
            models,
            attempts: AttemptLog::new(),
        }
    }

    #[must_use]
    pub fn tiers(&self, task: ModelTask) -> &[String] {
        match task {
            ModelTask::Draft => &self.models.draft,
            ModelTask::Review => &self.models.review,
        }
    }

    #[inline]
    #[must_use]
    pub fn attempts(&self) -> &AttemptLog {
        &self.attempts
    }

    /// Scheduled shutdown date of `model`, if one is configured
    #[must_use]
    pub fn end_of_life(&self, model: &str) -> Option<NaiveDate> {
        self.models.deprecations.get(model).copied()
    }

    /// Complete `prompt` on the first tier that is not out of quota.
    ///
    /// Exhausting every tier is transient: quotas refill.
    pub async fn complete(&self, task: ModelTask, prompt: &str) -> Result<String, GenerationError> {
        let tiers = self.tiers(task);
        let mut last_quota: Option<BackendError> = None;

        for (index, model) in tiers.iter().enumerate() {
            let tier = index + 1;
            if let Some(eol) = self.end_of_life(model) {
                tracing::warn!(%model, %eol, "model is scheduled for shutdown; move it down or replace it");
            }

            tracing::info!(%task, %model, tier, "attempting model");
            match self.backend.complete(model, prompt).await {
                Ok(text) => {
                    self.attempts.record(task, model, tier, AttemptOutcome::Success);
                    return Ok(text);
                }
                Err(err) if err.is_quota() => {
                    tracing::warn!(%task, %model, tier, error = %err, "quota exhausted, falling back");
                    self.attempts
                        .record(task, model, tier, AttemptOutcome::QuotaExhausted(err.to_string()));
                    last_quota = Some(err);
                }
                Err(err) => {
                    tracing::warn!(%task, %model, tier, error = %err, "model call failed");
                    self.attempts
                        .record(task, model, tier, AttemptOutcome::Failed(err.to_string()));
                    return Err(err.into());
                }
            }
        }

        let reason = last_quota.map_or_else(
            || format!("no models configured for {task}"),
            |err| format!("all {} tiers failed for {task}; last: {err}", tiers.len()),
        );
        tracing::error!(%task, %reason, "model tiers exhausted");
        Err(GenerationError::Transient(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Fixed response per model name
    struct Table(HashMap<&'static str, Result<&'static str, BackendError>>);

    #[async_trait]
    impl ModelBackend for Table {
        async fn complete(&self, model: &str, _prompt: &str) -> Result<String, BackendError> {
            match self.0.get(model) {
                Some(Ok(text)) => Ok((*text).to_string()),
                Some(Err(err)) => Err(err.clone()),
                None => Err(BackendError::Rejected(format!("unknown model {model}"))),
            }
        }
    }

    fn models() -> ModelsConfig {
        ModelsConfig {
            draft: vec!["m1".into(), "m2".into(), "m3".into()],
            review: vec!["m1".into()],
            deprecations: Default::default(),
        }
    }

    #[tokio::test]
    async fn quota_falls_back_to_next_tier() {
        let backend = Table(HashMap::from([
            ("m1", Err(BackendError::QuotaExhausted("429".into()))),
            ("m2", Ok("draft from m2")),
        ]));
        let model = TieredModel::new(backend, models());

        let text = model.complete(ModelTask::Draft, "p").await.unwrap();
        assert_eq!(text, "draft from m2");

        let records = model.attempts().records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tier, 1);
        assert!(matches!(records[0].outcome, AttemptOutcome::QuotaExhausted(_)));
        assert_eq!(records[1].model, "m2");
        assert_eq!(records[1].outcome, AttemptOutcome::Success);
    }

    #[tokio::test]
    async fn non_quota_error_stops_the_walk() {
        let backend = Table(HashMap::from([
            ("m1", Err(BackendError::Rejected("bad request".into()))),
            ("m2", Ok("never reached")),
        ]));
        let model = TieredModel::new(backend, models());

        let err = model.complete(ModelTask::Draft, "p").await.unwrap_err();
        assert!(matches!(err, GenerationError::Fatal(_)));
        assert_eq!(model.attempts().len(), 1);
    }

    #[tokio::test]
    async fn exhausting_every_tier_is_transient() {
        let quota = || Err(BackendError::QuotaExhausted("429".into()));
        let backend = Table(HashMap::from([("m1", quota()), ("m2", quota()), ("m3", quota())]));
        let model = TieredModel::new(backend, models());

        let err = model.complete(ModelTask::Draft, "p").await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(model.attempts().len(), 3);
    }

    #[test]
    fn deprecations_are_looked_up_by_name() {
        let mut config = models();
        let eol = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
        config.deprecations.insert("m2".into(), eol);
        let model = TieredModel::new(Table(HashMap::new()), config);

        assert_eq!(model.end_of_life("m2"), Some(eol));
        assert_eq!(model.end_of_life("m1"), None);
    }
}
