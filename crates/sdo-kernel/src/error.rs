//! Kernel error types

use crate::types::{SectionId, WorkflowStatus};

/// Dependency graph construction and lookup failures.
///
/// Every variant is a configuration problem: it is raised while a session is
/// being created, never discovered halfway through a workflow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// No sections declared
    #[error("workflow declares no sections")]
    Empty,

    /// Same id listed twice in the priority order
    #[error("section declared twice: {0}")]
    DuplicateSection(SectionId),

    /// Id not part of the section set
    #[error("unknown section: {0}")]
    UnknownSection(SectionId),

    /// Section lists itself as a dependency
    #[error("section depends on itself: {0}")]
    SelfDependency(SectionId),

    /// Sections that can never start because they wait on each other
    #[error("dependency cycle between sections: {members:?}")]
    CycleDetected { members: Vec<SectionId> },
}

/// Illegal workflow status transition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    #[error("illegal transition {from} -> {to}")]
    IllegalTransition {
        from: WorkflowStatus,
        to: WorkflowStatus,
    },
}

/// A persisted state that breaks a structural invariant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("status {status} inconsistent with current section {current:?}")]
    CurrentSectionMismatch {
        status: WorkflowStatus,
        current: Option<SectionId>,
    },

    #[error("revision count {revision_count} exceeds budget {max_revisions}")]
    RevisionBudgetExceeded {
        revision_count: u32,
        max_revisions: u32,
    },

    #[error("current section {0} is not in progress")]
    CurrentNotInProgress(SectionId),

    #[error("{0} sections in progress at once")]
    MultipleInProgress(usize),

    #[error("error message presence does not match status {0}")]
    ErrorMessageMismatch(WorkflowStatus),
}

/// Transition log failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    #[error("transition log hash chain broken at entry {index}")]
    IntegrityViolation { index: usize },
}
