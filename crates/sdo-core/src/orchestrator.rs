//! Section drafting orchestrator
//!
//! Drives one session at a time through
//! planner -> writer -> reviewer -> (revise | escalate | next section).
//!
//! Every entry point follows the same shape:
//! 1. take the per-session lock (a second concurrent call gets `SessionBusy`)
//! 2. load the snapshot and check its invariants
//! 3. compute the next snapshot without touching the loaded one
//! 4. validate the status change, bump `version`, save
//! 5. only after the save succeeds, record the transition
//!
//! A failure anywhere before step 4 completes leaves the stored snapshot as
//! it was, so callers can always retry from scratch.

use crate::collaborators::{CallOptions, ContentGenerator, Critic};
use crate::config::OrchestratorConfig;
use crate::error::{GenerationError, OrchestratorError};
use crate::reviewer::{ReviewerStep, Verdict};
use crate::templates::TemplateRegistry;
use crate::writer::WriterStep;
use chrono::Utc;
use dashmap::DashMap;
use sdo_kernel::dag::DependencyGraph;
use sdo_kernel::logging::{TransitionEvent, TransitionLog};
use sdo_kernel::planner::{assess, PlanOutcome};
use sdo_kernel::state_machine::validate_transition;
use sdo_kernel::{
    DraftContext, RevisionPolicy, SectionId, SectionStatus, SessionPolicy, WorkflowPlan,
    WorkflowState, WorkflowStatus,
};
use sdo_store::SessionStore;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Parameters of a new drafting session
#[derive(Debug, Clone)]
pub struct NewSession {
    pub context: DraftContext,
    pub plan: WorkflowPlan,
    pub max_revisions: Option<u32>,
    pub policy: Option<SessionPolicy>,
    pub session_id: Option<String>,
}

impl NewSession {
    #[must_use]
    pub fn new(context: DraftContext, plan: WorkflowPlan) -> Self {
        Self {
            context,
            plan,
            max_revisions: None,
            policy: None,
            session_id: None,
        }
    }

    #[must_use]
    pub fn with_max_revisions(mut self, max: u32) -> Self {
        self.max_revisions = Some(max);
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: SessionPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Use a caller-chosen id instead of a random one
    #[must_use]
    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }
}

/// Writer/reviewer loop over persisted sessions
pub struct Orchestrator {
    store: Arc<dyn SessionStore>,
    generator: Arc<dyn ContentGenerator>,
    critic: Arc<dyn Critic>,
    templates: Arc<TemplateRegistry>,
    config: OrchestratorConfig,
    /// One lock per session with an operation in flight; entries are
    /// removed when the last holder lets go
    locks: DashMap<String, Arc<Mutex<()>>>,
    /// One hash chain per session
    logs: DashMap<String, Arc<TransitionLog>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("templates", &self.templates.len())
            .field("config", &self.config)
            .field("active_locks", &self.locks.len())
            .field("logged_sessions", &self.logs.len())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        store: Arc<dyn SessionStore>,
        generator: Arc<dyn ContentGenerator>,
        critic: Arc<dyn Critic>,
    ) -> Self {
        Self {
            store,
            generator,
            critic,
            templates: Arc::new(TemplateRegistry::new()),
            config: OrchestratorConfig::default(),
            locks: DashMap::new(),
            logs: DashMap::new(),
        }
    }

    #[must_use]
    pub fn with_templates(mut self, templates: TemplateRegistry) -> Self {
        self.templates = Arc::new(templates);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Call options carrying the configured timeout and a fresh token
    #[must_use]
    pub fn call_options(&self) -> CallOptions {
        CallOptions::new(self.config.call_timeout())
    }

    /// Validate the plan and persist a fresh session with every section pending.
    ///
    /// Graph problems (unknown or duplicate ids, self-dependencies, cycles)
    /// are reported here and never later.
    pub async fn create_session(&self, new: NewSession) -> Result<String, OrchestratorError> {
        DependencyGraph::new(&new.plan)?;

        let session_id = new
            .session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let _guard = self.acquire(&session_id)?;

        if self.store.load(&session_id).await?.is_some() {
            return Err(OrchestratorError::SessionExists(session_id));
        }

        let state = WorkflowState::new(
            session_id.clone(),
            new.context,
            new.plan,
            new.max_revisions.unwrap_or(self.config.default_max_revisions),
            new.policy.unwrap_or_else(|| self.config.session_policy()),
        );
        self.store.save(&state).await?;

        tracing::info!(
            %session_id,
            sections = state.plan.sections.len(),
            max_revisions = state.max_revisions,
            "session created"
        );
        Ok(session_id)
    }

    /// Read-only snapshot of a session
    pub async fn get_state(&self, session_id: &str) -> Result<WorkflowState, OrchestratorError> {
        self.load(session_id).await
    }

    /// Perform one transition with the configured call timeout.
    ///
    /// A no-op returning the stored state when the session is `needs_human`,
    /// `completed` or `error`.
    pub async fn advance(&self, session_id: &str) -> Result<WorkflowState, OrchestratorError> {
        self.advance_with(session_id, &self.call_options()).await
    }

    /// Perform one transition, making at most one external call bounded by
    /// `options`.
    pub async fn advance_with(
        &self,
        session_id: &str,
        options: &CallOptions,
    ) -> Result<WorkflowState, OrchestratorError> {
        let _guard = self.acquire(session_id)?;
        let state = self.load(session_id).await?;

        match state.status {
            WorkflowStatus::NeedsHuman | WorkflowStatus::Completed | WorkflowStatus::Error => {
                tracing::debug!(%session_id, status = %state.status, "advance is a no-op while suspended");
                Ok(state)
            }
            WorkflowStatus::Pending => self.plan_next(state).await,
            WorkflowStatus::Writing => self.write(state, options).await,
            WorkflowStatus::Reviewing => self.review(state, options).await,
        }
    }

    /// Advance until the session suspends (`needs_human`, `completed` or
    /// `error`) or `max_steps` transitions have been made.
    pub async fn run_until_suspended(
        &self,
        session_id: &str,
        options: &CallOptions,
    ) -> Result<WorkflowState, OrchestratorError> {
        let mut state = self.load(session_id).await?;
        for _ in 0..self.config.max_steps {
            if state.status.is_suspended() {
                break;
            }
            state = self.advance_with(session_id, options).await?;
        }
        Ok(state)
    }

    /// Hand an escalated section back to the writer with human guidance
    pub async fn resume(
        &self,
        session_id: &str,
        user_intent: impl Into<String>,
    ) -> Result<WorkflowState, OrchestratorError> {
        let _guard = self.acquire(session_id)?;
        let state = self.load(session_id).await?;
        if state.status != WorkflowStatus::NeedsHuman {
            return Err(OrchestratorError::invalid_state(session_id, state.status, "resume"));
        }

        let mut next = state.clone();
        next.user_intent = Some(user_intent.into());
        if next.policy.revision == RevisionPolicy::ResetOnResume {
            next.revision_count = 0;
        }
        next.status = WorkflowStatus::Writing;
        self.commit(&state, next, "resumed with human guidance").await
    }

    /// Accept the escalated draft as is and complete its section
    pub async fn approve(&self, session_id: &str) -> Result<WorkflowState, OrchestratorError> {
        let _guard = self.acquire(session_id)?;
        let state = self.load(session_id).await?;
        if state.status != WorkflowStatus::NeedsHuman || state.draft_content.is_none() {
            return Err(OrchestratorError::invalid_state(session_id, state.status, "approve"));
        }

        let mut next = state.clone();
        complete_current(&mut next);
        next.status = WorkflowStatus::Pending;
        self.commit(&state, next, "approved by human").await
    }

    /// Mark a section skipped.
    ///
    /// Allowed between sections and during escalation; skipping the escalated
    /// section abandons its draft and returns the session to the planner.
    pub async fn skip(
        &self,
        session_id: &str,
        section: &SectionId,
    ) -> Result<WorkflowState, OrchestratorError> {
        let _guard = self.acquire(session_id)?;
        let state = self.load(session_id).await?;

        if !state.plan.sections.contains(section) {
            return Err(OrchestratorError::UnknownSection(section.clone()));
        }
        if !matches!(state.status, WorkflowStatus::Pending | WorkflowStatus::NeedsHuman)
            || state.section_status(section).is_finished()
        {
            return Err(OrchestratorError::invalid_state(session_id, state.status, "skip"));
        }

        let mut next = state.clone();
        next.sections_status.insert(section.clone(), SectionStatus::Skipped);
        if next.current_section.as_ref() == Some(section) {
            clear_current(&mut next);
            next.status = WorkflowStatus::Pending;
        }
        self.commit(&state, next, format!("skipped {section}")).await
    }

    /// Leave the error state.
    ///
    /// The section that was in flight, if any, is re-selected for writing with
    /// its revision count and critiques intact; otherwise the planner runs on
    /// the next advance.
    pub async fn retry(&self, session_id: &str) -> Result<WorkflowState, OrchestratorError> {
        let _guard = self.acquire(session_id)?;
        let state = self.load(session_id).await?;
        if state.status != WorkflowStatus::Error {
            return Err(OrchestratorError::invalid_state(session_id, state.status, "retry"));
        }

        let mut next = state.clone();
        next.error_message = None;
        match state.in_progress_section() {
            Some(section) => {
                next.current_section = Some(section.clone());
                next.status = WorkflowStatus::Writing;
            }
            None => next.status = WorkflowStatus::Pending,
        }
        self.commit(&state, next, "retry requested").await
    }

    /// Transitions this orchestrator committed for a session, oldest first.
    ///
    /// The history is kept in memory only. An orchestrator that picks up a
    /// session from a checkpoint starts a fresh chain; `WorkflowState::version`
    /// counts every commit ever made. Callers that need the full history
    /// persist what [`Orchestrator::take_transitions`] hands back.
    #[must_use]
    pub fn transitions(&self, session_id: &str) -> Vec<TransitionEvent> {
        self.logs
            .get(session_id)
            .map(|log| log.events())
            .unwrap_or_default()
    }

    /// The hash-chained log of one session, if anything was committed
    #[must_use]
    pub fn transition_log(&self, session_id: &str) -> Option<Arc<TransitionLog>> {
        self.logs.get(session_id).map(|log| Arc::clone(&log))
    }

    /// Remove a session's in-memory history and return it
    pub fn take_transitions(&self, session_id: &str) -> Vec<TransitionEvent> {
        self.logs
            .remove(session_id)
            .map(|(_, log)| log.events())
            .unwrap_or_default()
    }

    /// Delete a session's snapshot and drop its history.
    ///
    /// Returns whether the store held the session.
    pub async fn delete_session(&self, session_id: &str) -> Result<bool, OrchestratorError> {
        let _guard = self.acquire(session_id)?;
        let existed = self.store.delete(session_id).await?;
        self.logs.remove(session_id);
        tracing::info!(%session_id, existed, "session deleted");
        Ok(existed)
    }

    async fn plan_next(&self, state: WorkflowState) -> Result<WorkflowState, OrchestratorError> {
        let graph = DependencyGraph::new(&state.plan)?;
        let mut next = state.clone();

        let detail = match assess(&state.sections_status, &graph, state.policy.skip) {
            PlanOutcome::Next(section) => {
                next.sections_status.insert(section.clone(), SectionStatus::InProgress);
                next.current_section = Some(section.clone());
                next.revision_count = 0;
                next.draft_content = None;
                next.critique_list.clear();
                next.status = WorkflowStatus::Writing;
                format!("selected {section}")
            }
            PlanOutcome::AllFinished => {
                next.status = WorkflowStatus::Completed;
                "all sections finished".to_string()
            }
            PlanOutcome::Blocked(remaining) => {
                let names: Vec<&str> = remaining.iter().map(SectionId::as_str).collect();
                let message = format!(
                    "no section can start; unfinished dependencies block: {}",
                    names.join(", ")
                );
                tracing::error!(session_id = %state.session_id, %message, "planner blocked");
                next.status = WorkflowStatus::Error;
                next.error_message = Some(message.clone());
                message
            }
        };

        self.commit(&state, next, detail).await
    }

    async fn write(
        &self,
        state: WorkflowState,
        options: &CallOptions,
    ) -> Result<WorkflowState, OrchestratorError> {
        let graph = DependencyGraph::new(&state.plan)?;
        let writer = WriterStep::new(self.generator.as_ref(), &self.templates);

        match writer.draft(&state, &graph, options).await {
            Ok(mut next) => {
                next.status = WorkflowStatus::Reviewing;
                self.commit(&state, next, "draft generated").await
            }
            Err(err) => self.external_failure(state, err).await,
        }
    }

    async fn review(
        &self,
        state: WorkflowState,
        options: &CallOptions,
    ) -> Result<WorkflowState, OrchestratorError> {
        let reviewer = ReviewerStep::new(self.critic.as_ref(), &self.templates);

        let (mut next, verdict) = match reviewer.review(&state, options).await {
            Ok(outcome) => outcome,
            Err(err) => return self.external_failure(state, err).await,
        };

        match verdict {
            Verdict::Resolved => {
                complete_current(&mut next);
                next.status = WorkflowStatus::Pending;
            }
            Verdict::NeedsRevision => {
                next.revision_count += 1;
                next.status = WorkflowStatus::Writing;
            }
            Verdict::NeedsHuman => {
                tracing::warn!(
                    session_id = %state.session_id,
                    section = ?state.current_section,
                    issues = next.critique_list.len(),
                    revision_count = next.revision_count,
                    "revision budget spent, escalating to human"
                );
                next.status = WorkflowStatus::NeedsHuman;
            }
        }

        self.commit(&state, next, verdict.to_string()).await
    }

    /// Transient and cancelled calls change nothing; fatal ones are recorded.
    async fn external_failure(
        &self,
        state: WorkflowState,
        err: GenerationError,
    ) -> Result<WorkflowState, OrchestratorError> {
        let section = state
            .current_section
            .clone()
            .unwrap_or_else(|| SectionId::new("<none>"));

        match err {
            GenerationError::Transient(message) => {
                tracing::warn!(
                    session_id = %state.session_id,
                    %section,
                    status = %state.status,
                    %message,
                    "transient failure, state unchanged"
                );
                Err(OrchestratorError::TransientGeneration { section, message })
            }
            GenerationError::Cancelled => {
                tracing::info!(session_id = %state.session_id, %section, "call cancelled, state unchanged");
                Err(OrchestratorError::Cancelled)
            }
            GenerationError::Fatal(message) => {
                tracing::error!(
                    session_id = %state.session_id,
                    %section,
                    status = %state.status,
                    %message,
                    "fatal failure"
                );
                let mut next = state.clone();
                next.status = WorkflowStatus::Error;
                next.error_message = Some(format!("{section}: {message}"));
                // the section stays in_progress so retry() can pick it up again
                next.current_section = None;
                self.commit(&state, next, message).await
            }
        }
    }

    /// Validate, persist, then record the transition
    async fn commit(
        &self,
        prev: &WorkflowState,
        mut next: WorkflowState,
        detail: impl Into<String>,
    ) -> Result<WorkflowState, OrchestratorError> {
        if prev.status != next.status {
            validate_transition(prev.status, next.status)?;
        }
        next.check_invariants()
            .map_err(|violation| OrchestratorError::Corrupted {
                session_id: next.session_id.clone(),
                violation,
            })?;

        next.version = prev.version + 1;
        next.updated_at = Utc::now();
        self.store.save(&next).await?;

        let section = next
            .current_section
            .clone()
            .or_else(|| prev.current_section.clone());
        tracing::info!(
            session_id = %next.session_id,
            section = section.as_ref().map_or("-", SectionId::as_str),
            from = %prev.status,
            to = %next.status,
            revision_count = next.revision_count,
            version = next.version,
            "transition"
        );
        self.logs
            .entry(next.session_id.clone())
            .or_default()
            .append(TransitionEvent::new(
                next.session_id.clone(),
                section,
                prev.status,
                next.status,
                next.revision_count,
                detail,
            ));
        Ok(next)
    }

    async fn load(&self, session_id: &str) -> Result<WorkflowState, OrchestratorError> {
        let state = self
            .store
            .load(session_id)
            .await?
            .ok_or_else(|| OrchestratorError::SessionNotFound(session_id.to_string()))?;
        state
            .check_invariants()
            .map_err(|violation| OrchestratorError::Corrupted {
                session_id: session_id.to_string(),
                violation,
            })?;
        Ok(state)
    }

    fn acquire(&self, session_id: &str) -> Result<SessionGuard<'_>, OrchestratorError> {
        let lock = self
            .locks
            .entry(session_id.to_string())
            .or_default()
            .clone();
        // on failure another caller holds the lock and will clean up the entry
        let guard = lock
            .try_lock_owned()
            .map_err(|_| OrchestratorError::SessionBusy(session_id.to_string()))?;
        Ok(SessionGuard {
            locks: &self.locks,
            session_id: session_id.to_string(),
            guard: Some(guard),
        })
    }
}

/// Exclusive hold on one session; drops the lock entry once unshared
struct SessionGuard<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    session_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // new holders clone under the shard lock, so a count of one is final
        self.locks
            .remove_if(&self.session_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Archive the current draft and mark its section completed
fn complete_current(state: &mut WorkflowState) {
    if let Some(section) = state.current_section.clone() {
        state
            .sections_status
            .insert(section.clone(), SectionStatus::Completed);
        if let Some(draft) = state.draft_content.take() {
            state.completed_drafts.insert(section, draft);
        }
    }
    clear_current(state);
}

fn clear_current(state: &mut WorkflowState) {
    state.current_section = None;
    state.draft_content = None;
    state.critique_list.clear();
    state.user_intent = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::KeywordCritic;
    use crate::offline::OfflineGenerator;
    use crate::presets::{business_continuity_plan, business_continuity_templates};
    use sdo_store::MemoryStore;

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(
            Arc::new(MemoryStore::new()),
            Arc::new(OfflineGenerator::new()),
            Arc::new(KeywordCritic::new()),
        )
        .with_templates(business_continuity_templates())
    }

    #[tokio::test]
    async fn preset_runs_to_completion_offline() {
        let orch = orchestrator();
        let id = orch
            .create_session(NewSession::new(
                DraftContext::new("Test Manufacturing Co.", "Wakayama", "Ten staff."),
                business_continuity_plan(),
            ))
            .await
            .unwrap();

        let state = orch.run_until_suspended(&id, &orch.call_options()).await.unwrap();

        assert_eq!(state.status, WorkflowStatus::Completed);
        assert!(state.all_sections_finished());
        assert_eq!(state.completed_drafts.len(), 12);
        assert!(orch
            .transition_log(&id)
            .is_some_and(|log| log.verify_integrity().is_ok()));
    }

    #[tokio::test]
    async fn held_lock_reports_busy() {
        let orch = orchestrator();
        let id = orch
            .create_session(NewSession::new(DraftContext::default(), WorkflowPlan::new(["a"])))
            .await
            .unwrap();

        let held = orch.acquire(&id).unwrap();
        assert!(matches!(
            orch.advance(&id).await,
            Err(OrchestratorError::SessionBusy(_))
        ));
        assert_eq!(orch.locks.len(), 1);

        drop(held);
        assert!(orch.locks.is_empty());
        assert!(orch.advance(&id).await.is_ok());
        assert!(orch.locks.is_empty());
    }

    #[tokio::test]
    async fn unknown_sessions_leave_no_lock_entries() {
        let orch = orchestrator();
        for i in 0..1000 {
            assert!(matches!(
                orch.advance(&format!("missing-{i}")).await,
                Err(OrchestratorError::SessionNotFound(_))
            ));
        }
        assert!(orch.locks.is_empty());
        assert!(orch.logs.is_empty());
    }

    #[test]
    fn completing_archives_the_draft() {
        let mut state = WorkflowState::new(
            "s",
            DraftContext::default(),
            WorkflowPlan::new(["a"]),
            2,
            SessionPolicy::default(),
        );
        let a = SectionId::from("a");
        state.sections_status.insert(a.clone(), SectionStatus::InProgress);
        state.current_section = Some(a.clone());
        state.draft_content = Some("text".into());
        state.revision_count = 2;

        complete_current(&mut state);

        assert_eq!(state.section_status(&a), SectionStatus::Completed);
        assert_eq!(state.completed_drafts.get(&a).map(String::as_str), Some("text"));
        assert_eq!(state.current_section, None);
        assert!(state.critique_list.is_empty());
        // reset happens when the planner selects the next section
        assert_eq!(state.revision_count, 2);
    }
}
