//! Planner
//!
//! Picks the next section to draft. The planner holds no state of its own:
//! given structurally equal status maps it always returns the same answer,
//! which keeps tests reproducible and retries after a restart safe.

use crate::dag::DependencyGraph;
use crate::types::{SectionId, SectionStatus, SkipPolicy};
use std::collections::BTreeMap;

/// Result of asking the planner what to do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    /// First pending section, in priority order, whose dependencies are done
    Next(SectionId),
    /// Every section is completed or skipped
    AllFinished,
    /// Pending sections remain but none can start
    Blocked(Vec<SectionId>),
}

/// Return the first pending section whose dependencies are satisfied.
///
/// `None` covers both "everything finished" and "everything left is blocked";
/// use [`assess`] to tell them apart.
#[must_use]
pub fn select_next(
    statuses: &BTreeMap<SectionId, SectionStatus>,
    graph: &DependencyGraph,
    policy: SkipPolicy,
) -> Option<SectionId> {
    graph
        .sections()
        .iter()
        .find(|section| {
            let pending = statuses
                .get(*section)
                .map_or(true, |s| *s == SectionStatus::Pending);
            pending
                && graph
                    .satisfied(section, statuses, policy)
                    .unwrap_or(false)
        })
        .cloned()
}

/// Classify the workflow's position for the orchestrator
#[must_use]
pub fn assess(
    statuses: &BTreeMap<SectionId, SectionStatus>,
    graph: &DependencyGraph,
    policy: SkipPolicy,
) -> PlanOutcome {
    if let Some(next) = select_next(statuses, graph, policy) {
        return PlanOutcome::Next(next);
    }

    let unfinished: Vec<SectionId> = graph
        .sections()
        .iter()
        .filter(|section| {
            !statuses
                .get(*section)
                .is_some_and(|s| s.is_finished())
        })
        .cloned()
        .collect();

    if unfinished.is_empty() {
        PlanOutcome::AllFinished
    } else {
        PlanOutcome::Blocked(unfinished)
    }
}

/// Convenience wrapper binding a graph to a skip policy
#[derive(Debug, Clone, Copy)]
pub struct Planner<'g> {
    graph: &'g DependencyGraph,
    policy: SkipPolicy,
}

impl<'g> Planner<'g> {
    #[inline]
    #[must_use]
    pub fn new(graph: &'g DependencyGraph, policy: SkipPolicy) -> Self {
        Self { graph, policy }
    }

    #[must_use]
    pub fn select_next(&self, statuses: &BTreeMap<SectionId, SectionStatus>) -> Option<SectionId> {
        select_next(statuses, self.graph, self.policy)
    }

    #[must_use]
    pub fn assess(&self, statuses: &BTreeMap<SectionId, SectionStatus>) -> PlanOutcome {
        assess(statuses, self.graph, self.policy)
    }
}
