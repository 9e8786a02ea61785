//! Reviewer step
//!
//! Runs the critic on the latest draft and classifies the outcome. The
//! reviewer only classifies; the orchestrator applies the transition.

use crate::collaborators::{bounded, CallOptions, Critic, ReviewRequest};
use crate::error::GenerationError;
use crate::templates::TemplateRegistry;
use sdo_kernel::{CritiqueItem, WorkflowState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// No open critiques; the section can be completed
    Resolved,
    /// Open critiques and revision budget left
    NeedsRevision,
    /// Open critiques and the budget is spent
    NeedsHuman,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resolved => "resolved",
            Self::NeedsRevision => "needs_revision",
            Self::NeedsHuman => "needs_human",
        })
    }
}

/// Classify a critique list against the revision budget.
///
/// Items a critic already marked resolved do not count as open.
#[must_use]
pub fn classify(critiques: &[CritiqueItem], revision_count: u32, max_revisions: u32) -> Verdict {
    let open = critiques.iter().any(|c| !c.is_resolved);
    if !open {
        Verdict::Resolved
    } else if revision_count < max_revisions {
        Verdict::NeedsRevision
    } else {
        Verdict::NeedsHuman
    }
}

pub struct ReviewerStep<'a> {
    critic: &'a dyn Critic,
    templates: &'a TemplateRegistry,
}

impl<'a> ReviewerStep<'a> {
    #[inline]
    #[must_use]
    pub fn new(critic: &'a dyn Critic, templates: &'a TemplateRegistry) -> Self {
        Self { critic, templates }
    }

    pub fn build_request(&self, state: &WorkflowState) -> Result<ReviewRequest, GenerationError> {
        let section = state
            .current_section
            .clone()
            .ok_or_else(|| GenerationError::Fatal("no current section to review".into()))?;
        let draft = state
            .draft_content
            .clone()
            .ok_or_else(|| GenerationError::Fatal(format!("no draft to review for {section}")))?;

        Ok(ReviewRequest {
            template: self.templates.resolve(&section),
            section,
            draft,
        })
    }

    /// Critique the current draft.
    ///
    /// The returned state carries the critic's list in place of the old one.
    pub async fn review(
        &self,
        state: &WorkflowState,
        options: &CallOptions,
    ) -> Result<(WorkflowState, Verdict), GenerationError> {
        let request = self.build_request(state)?;

        let critiques = bounded(options, self.critic.critique(&request, options)).await?;
        let verdict = classify(&critiques, state.revision_count, state.max_revisions);

        tracing::debug!(
            session_id = %state.session_id,
            section = %request.section,
            issues = critiques.len(),
            %verdict,
            "review classified"
        );

        let mut next = state.clone();
        next.critique_list = critiques;
        Ok((next, verdict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(n: usize) -> Vec<CritiqueItem> {
        (0..n).map(|i| CritiqueItem::new(format!("issue {i}"))).collect()
    }

    #[test]
    fn empty_list_resolves_regardless_of_budget() {
        assert_eq!(classify(&[], 0, 3), Verdict::Resolved);
        assert_eq!(classify(&[], 3, 3), Verdict::Resolved);
    }

    #[test]
    fn budget_decides_between_revision_and_human() {
        assert_eq!(classify(&open(1), 0, 2), Verdict::NeedsRevision);
        assert_eq!(classify(&open(2), 1, 2), Verdict::NeedsRevision);
        assert_eq!(classify(&open(1), 2, 2), Verdict::NeedsHuman);
        assert_eq!(classify(&open(1), 0, 0), Verdict::NeedsHuman);
    }

    #[test]
    fn resolved_items_are_not_open() {
        let mut items = open(1);
        items[0].is_resolved = true;
        assert_eq!(classify(&items, 0, 2), Verdict::Resolved);
    }
}
