//! Core workflow types
//!
//! `WorkflowState` is the unit of persistence. Every step receives it
//! explicitly and hands back the mutated copy; nothing reads ambient state.

use crate::error::InvariantViolation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier of one section of the target document
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(String);

impl SectionId {
    /// Create a section id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SectionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Per-section progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Pending,
    InProgress,
    Completed,
    Skipped,
}

impl SectionStatus {
    /// Completed or skipped; the planner never revisits these.
    #[inline]
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

/// Workflow-level state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Between sections, the planner runs on the next advance
    Pending,
    /// Next advance invokes the content generator
    Writing,
    /// Next advance invokes the critic
    Reviewing,
    /// Suspended until a human resumes, approves or skips
    NeedsHuman,
    /// Every section completed or skipped
    Completed,
    /// A fatal failure was recorded in `error_message`
    Error,
}

impl WorkflowStatus {
    /// States in which a section must be active.
    #[inline]
    #[must_use]
    pub fn has_active_section(self) -> bool {
        matches!(self, Self::Writing | Self::Reviewing | Self::NeedsHuman)
    }

    /// States where `advance` makes no progress on its own.
    #[inline]
    #[must_use]
    pub fn is_suspended(self) -> bool {
        matches!(self, Self::NeedsHuman | Self::Completed | Self::Error)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Writing => "writing",
            Self::Reviewing => "reviewing",
            Self::NeedsHuman => "needs_human",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// A structured issue raised against a draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CritiqueItem {
    pub issue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default)]
    pub is_resolved: bool,
}

impl CritiqueItem {
    /// Create an unresolved critique without a reference
    #[inline]
    #[must_use]
    pub fn new(issue: impl Into<String>) -> Self {
        Self {
            issue: issue.into(),
            reference: None,
            is_resolved: false,
        }
    }

    /// Attach a reference example
    #[inline]
    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Input bundle supplied once at session creation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftContext {
    pub applicant_name: String,
    pub location: String,
    pub interview_transcript: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl DraftContext {
    #[must_use]
    pub fn new(
        applicant_name: impl Into<String>,
        location: impl Into<String>,
        interview_transcript: impl Into<String>,
    ) -> Self {
        Self {
            applicant_name: applicant_name.into(),
            location: location.into(),
            interview_transcript: interview_transcript.into(),
            extra: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// What happens to `revision_count` when a human resumes an escalated section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionPolicy {
    /// Keep counting; each human round buys exactly one more attempt.
    #[default]
    Cumulative,
    /// Start a fresh automatic revision budget.
    ResetOnResume,
}

/// Whether a skipped dependency unblocks its dependents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipPolicy {
    #[default]
    Blocks,
    Satisfies,
}

impl SkipPolicy {
    /// Does a dependency in `status` count as done?
    #[inline]
    #[must_use]
    pub fn satisfies(self, status: SectionStatus) -> bool {
        match status {
            SectionStatus::Completed => true,
            SectionStatus::Skipped => matches!(self, Self::Satisfies),
            SectionStatus::Pending | SectionStatus::InProgress => false,
        }
    }
}

/// Session-scoped policy choices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPolicy {
    #[serde(default)]
    pub revision: RevisionPolicy,
    #[serde(default)]
    pub skip: SkipPolicy,
}

/// Section priority order plus declared dependencies.
///
/// Persisted with the state so a restored session rebuilds the same graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowPlan {
    pub sections: Vec<SectionId>,
    #[serde(default)]
    pub dependencies: BTreeMap<SectionId, BTreeSet<SectionId>>,
}

impl WorkflowPlan {
    #[must_use]
    pub fn new(sections: impl IntoIterator<Item = impl Into<SectionId>>) -> Self {
        Self {
            sections: sections.into_iter().map(Into::into).collect(),
            dependencies: BTreeMap::new(),
        }
    }

    /// Declare that `section` needs `requires` finished first
    #[must_use]
    pub fn with_dependency(
        mut self,
        section: impl Into<SectionId>,
        requires: impl Into<SectionId>,
    ) -> Self {
        self.dependencies
            .entry(section.into())
            .or_default()
            .insert(requires.into());
        self
    }
}

/// The persisted snapshot of one drafting session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub session_id: String,
    pub context: DraftContext,
    pub plan: WorkflowPlan,
    pub policy: SessionPolicy,
    pub sections_status: BTreeMap<SectionId, SectionStatus>,
    pub current_section: Option<SectionId>,
    pub draft_content: Option<String>,
    pub critique_list: Vec<CritiqueItem>,
    pub revision_count: u32,
    pub max_revisions: u32,
    pub status: WorkflowStatus,
    pub user_intent: Option<String>,
    pub error_message: Option<String>,
    /// Accepted text of every completed section
    #[serde(default)]
    pub completed_drafts: BTreeMap<SectionId, String>,
    /// Bumped on every persisted transition
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowState {
    /// Fresh state with every section pending
    #[must_use]
    pub fn new(
        session_id: impl Into<String>,
        context: DraftContext,
        plan: WorkflowPlan,
        max_revisions: u32,
        policy: SessionPolicy,
    ) -> Self {
        let now = Utc::now();
        let sections_status = plan
            .sections
            .iter()
            .map(|id| (id.clone(), SectionStatus::Pending))
            .collect();

        Self {
            session_id: session_id.into(),
            context,
            plan,
            policy,
            sections_status,
            current_section: None,
            draft_content: None,
            critique_list: Vec::new(),
            revision_count: 0,
            max_revisions,
            status: WorkflowStatus::Pending,
            user_intent: None,
            error_message: None,
            completed_drafts: BTreeMap::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Status of a section; unknown ids read as pending like the planner does.
    #[must_use]
    pub fn section_status(&self, section: &SectionId) -> SectionStatus {
        self.sections_status
            .get(section)
            .copied()
            .unwrap_or(SectionStatus::Pending)
    }

    /// The section left `in_progress`, if any
    #[must_use]
    pub fn in_progress_section(&self) -> Option<&SectionId> {
        self.sections_status
            .iter()
            .find(|(_, status)| **status == SectionStatus::InProgress)
            .map(|(id, _)| id)
    }

    /// True once every section is completed or skipped
    #[must_use]
    pub fn all_sections_finished(&self) -> bool {
        self.plan
            .sections
            .iter()
            .all(|id| self.section_status(id).is_finished())
    }

    /// Check the structural invariants that must hold between transitions.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.status.has_active_section() != self.current_section.is_some() {
            return Err(InvariantViolation::CurrentSectionMismatch {
                status: self.status,
                current: self.current_section.clone(),
            });
        }

        if self.revision_count > self.max_revisions {
            return Err(InvariantViolation::RevisionBudgetExceeded {
                revision_count: self.revision_count,
                max_revisions: self.max_revisions,
            });
        }

        if let Some(current) = &self.current_section {
            if self.section_status(current) != SectionStatus::InProgress {
                return Err(InvariantViolation::CurrentNotInProgress(current.clone()));
            }
        }

        let in_progress = self
            .sections_status
            .values()
            .filter(|s| **s == SectionStatus::InProgress)
            .count();
        if in_progress > 1 {
            return Err(InvariantViolation::MultipleInProgress(in_progress));
        }

        if self.error_message.is_some() != (self.status == WorkflowStatus::Error) {
            return Err(InvariantViolation::ErrorMessageMismatch(self.status));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> WorkflowPlan {
        WorkflowPlan::new(["a", "b"]).with_dependency("b", "a")
    }

    #[test]
    fn new_state_is_all_pending() {
        let state = WorkflowState::new("s1", DraftContext::default(), plan(), 3, SessionPolicy::default());

        assert_eq!(state.status, WorkflowStatus::Pending);
        assert!(state
            .sections_status
            .values()
            .all(|s| *s == SectionStatus::Pending));
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn skip_policy_decides_skipped() {
        assert!(!SkipPolicy::Blocks.satisfies(SectionStatus::Skipped));
        assert!(SkipPolicy::Satisfies.satisfies(SectionStatus::Skipped));
        assert!(SkipPolicy::Blocks.satisfies(SectionStatus::Completed));
        assert!(!SkipPolicy::Satisfies.satisfies(SectionStatus::InProgress));
    }

    #[test]
    fn invariant_flags_writing_without_section() {
        let mut state = WorkflowState::new("s1", DraftContext::default(), plan(), 3, SessionPolicy::default());
        state.status = WorkflowStatus::Writing;

        assert!(matches!(
            state.check_invariants(),
            Err(InvariantViolation::CurrentSectionMismatch { .. })
        ));
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&WorkflowStatus::NeedsHuman).unwrap();
        assert_eq!(json, "\"needs_human\"");
        assert_eq!(WorkflowStatus::NeedsHuman.to_string(), "needs_human");
    }
}
