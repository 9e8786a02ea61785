//! External collaborator boundary
//!
//! The orchestrator reaches the outside world through exactly two traits:
//! `ContentGenerator` drafts a section, `Critic` reviews a draft. Both are
//! plain request/response calls; the orchestrator bounds every call with a
//! timeout and a cancellation token carried in `CallOptions`.

use crate::error::GenerationError;
use crate::prompts;
use crate::templates::SectionTemplate;
use async_trait::async_trait;
use sdo_kernel::{CritiqueItem, DraftContext, SectionId};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default bound on a single external call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Per-call limits
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub timeout: Duration,
    pub cancel: CancellationToken,
}

impl CallOptions {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl Default for CallOptions {
    fn default() -> Self {
        Self::new(DEFAULT_CALL_TIMEOUT)
    }
}

/// Everything a generator needs to draft one section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub section: SectionId,
    pub template: SectionTemplate,
    pub context: DraftContext,
    /// Critiques of the previous draft, empty on a first draft
    pub critiques: Vec<CritiqueItem>,
    /// Human guidance supplied on resume
    pub user_intent: Option<String>,
    /// Accepted drafts of the sections this one depends on
    pub prior_sections: BTreeMap<SectionId, String>,
}

impl GenerationRequest {
    /// Whether this is a revision rather than a first draft
    #[inline]
    #[must_use]
    pub fn is_revision(&self) -> bool {
        !self.critiques.is_empty() || self.user_intent.is_some()
    }

    /// Render the writer prompt for model-backed generators
    #[must_use]
    pub fn render_prompt(&self) -> String {
        prompts::writer_prompt(self)
    }
}

/// Everything a critic needs to review one draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    pub section: SectionId,
    pub template: SectionTemplate,
    pub draft: String,
}

impl ReviewRequest {
    #[must_use]
    pub fn render_prompt(&self) -> String {
        prompts::reviewer_prompt(self)
    }
}

/// Produces draft text for a section
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest,
        options: &CallOptions,
    ) -> Result<String, GenerationError>;
}

/// Reviews a draft; an empty list means the draft is accepted
#[async_trait]
pub trait Critic: Send + Sync {
    async fn critique(
        &self,
        request: &ReviewRequest,
        options: &CallOptions,
    ) -> Result<Vec<CritiqueItem>, GenerationError>;
}

#[async_trait]
impl<T: ContentGenerator + ?Sized> ContentGenerator for Arc<T> {
    async fn generate(
        &self,
        request: &GenerationRequest,
        options: &CallOptions,
    ) -> Result<String, GenerationError> {
        (**self).generate(request, options).await
    }
}

#[async_trait]
impl<T: Critic + ?Sized> Critic for Arc<T> {
    async fn critique(
        &self,
        request: &ReviewRequest,
        options: &CallOptions,
    ) -> Result<Vec<CritiqueItem>, GenerationError> {
        (**self).critique(request, options).await
    }
}

/// Run `call` under the timeout and cancellation token in `options`.
///
/// A timeout is transient; cancellation wins over a result that is ready at
/// the same time.
pub(crate) async fn bounded<T, F>(options: &CallOptions, call: F) -> Result<T, GenerationError>
where
    F: Future<Output = Result<T, GenerationError>>,
{
    if options.cancel.is_cancelled() {
        return Err(GenerationError::Cancelled);
    }

    tokio::select! {
        biased;
        () = options.cancel.cancelled() => Err(GenerationError::Cancelled),
        outcome = tokio::time::timeout(options.timeout, call) => match outcome {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Transient(format!(
                "call timed out after {}s",
                options.timeout.as_secs_f64()
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timeout_is_transient() {
        let options = CallOptions::new(Duration::from_millis(50));
        let result: Result<(), _> = bounded(&options, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(GenerationError::Transient(_))));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let options = CallOptions::default();
        options.cancel.cancel();

        let result = bounded(&options, async { Ok::<_, GenerationError>(1) }).await;
        assert_eq!(result, Err(GenerationError::Cancelled));
    }

    #[tokio::test]
    async fn completed_call_passes_through() {
        let options = CallOptions::default();
        let result = bounded(&options, async { Ok::<_, GenerationError>("draft") }).await;
        assert_eq!(result, Ok("draft"));
    }
}
