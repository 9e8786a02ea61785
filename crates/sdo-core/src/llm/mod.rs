//! Model-backed collaborators
//!
//! - `ModelBackend`: one completion call against one named model
//! - `TieredModel`: ordered fallback over models on quota exhaustion
//! - `ModelGenerator` / `ModelCritic`: the collaborator traits on top
//!
//! No concrete HTTP backend ships here; callers plug in their own client.

pub mod review;
pub mod tiered;

pub use review::{parse_review, ReviewOutcome};
pub use tiered::{AttemptLog, AttemptOutcome, AttemptRecord, ModelTask, TieredModel};

use crate::collaborators::{CallOptions, ContentGenerator, Critic, GenerationRequest, ReviewRequest};
use crate::error::GenerationError;
use async_trait::async_trait;
use sdo_kernel::CritiqueItem;
use std::sync::Arc;

/// Failure of a single completion call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Rate limit or quota hit; a lower tier may still have budget
    #[error("quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    /// The model refused the request as malformed or unsupported
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl BackendError {
    #[inline]
    #[must_use]
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExhausted(_))
    }
}

impl From<BackendError> for GenerationError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::QuotaExhausted(_) | BackendError::Timeout(_) | BackendError::Network(_) => {
                Self::Transient(err.to_string())
            }
            BackendError::Rejected(_) => Self::Fatal(err.to_string()),
        }
    }
}

/// One completion call against a named model
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, BackendError>;
}

#[async_trait]
impl<T: ModelBackend + ?Sized> ModelBackend for Arc<T> {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, BackendError> {
        (**self).complete(model, prompt).await
    }
}

/// Content generator that prompts the draft tier list
#[derive(Debug)]
pub struct ModelGenerator<B> {
    model: Arc<TieredModel<B>>,
}

impl<B: ModelBackend> ModelGenerator<B> {
    #[must_use]
    pub fn new(model: Arc<TieredModel<B>>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl<B: ModelBackend> ContentGenerator for ModelGenerator<B> {
    async fn generate(
        &self,
        request: &GenerationRequest,
        options: &CallOptions,
    ) -> Result<String, GenerationError> {
        if options.cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }
        let text = self
            .model
            .complete(ModelTask::Draft, &request.render_prompt())
            .await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(GenerationError::Transient(format!(
                "empty draft returned for {}",
                request.section
            )));
        }
        Ok(text.to_string())
    }
}

/// Critic that prompts the review tier list and parses a PASS/FAIL verdict
#[derive(Debug)]
pub struct ModelCritic<B> {
    model: Arc<TieredModel<B>>,
}

impl<B: ModelBackend> ModelCritic<B> {
    #[must_use]
    pub fn new(model: Arc<TieredModel<B>>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl<B: ModelBackend> Critic for ModelCritic<B> {
    async fn critique(
        &self,
        request: &ReviewRequest,
        options: &CallOptions,
    ) -> Result<Vec<CritiqueItem>, GenerationError> {
        if options.cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }
        let text = self
            .model
            .complete(ModelTask::Review, &request.render_prompt())
            .await?;
        Ok(match parse_review(&text) {
            ReviewOutcome::Pass => Vec::new(),
            ReviewOutcome::Fail(items) => items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_errors_classify() {
        assert!(GenerationError::from(BackendError::Network("reset".into())).is_retryable());
        assert!(GenerationError::from(BackendError::Timeout("60s".into())).is_retryable());
        assert!(matches!(
            GenerationError::from(BackendError::Rejected("400".into())),
            GenerationError::Fatal(_)
        ));
    }
}
