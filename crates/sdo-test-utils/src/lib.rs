//! Testing utilities for the SDO workspace
//!
//! Scripted collaborators, store failure injection and fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use sdo_core::{
    CallOptions, ContentGenerator, Critic, GenerationError, GenerationRequest, KeywordCritic,
    OfflineGenerator, Orchestrator, OrchestratorConfig, ReviewRequest,
};
use sdo_kernel::{CritiqueItem, DraftContext, WorkflowPlan, WorkflowState};
use sdo_store::{MemoryStore, SessionStore, StoreError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Content generator replaying a script, then a numbered default draft.
///
/// Every request is recorded for later inspection.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<String, GenerationError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    delay: Option<Duration>,
}

impl ScriptedGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn then(self, response: Result<String, GenerationError>) -> Self {
        self.script.lock().push_back(response);
        self
    }

    #[must_use]
    pub fn then_text(self, text: &str) -> Self {
        self.then(Ok(text.to_string()))
    }

    /// Sleep this long before answering
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    #[must_use]
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }

    #[must_use]
    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
        _options: &CallOptions,
    ) -> Result<String, GenerationError> {
        let call = {
            let mut requests = self.requests.lock();
            requests.push(request.clone());
            requests.len()
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.script.lock().pop_front();
        scripted.unwrap_or_else(|| Ok(format!("draft {call} of {}", request.section)))
    }
}

/// Critic replaying a script, then a fixed fallback answer
#[derive(Debug)]
pub struct ScriptedCritic {
    script: Mutex<VecDeque<Result<Vec<CritiqueItem>, GenerationError>>>,
    fallback: Vec<CritiqueItem>,
    calls: AtomicUsize,
}

impl ScriptedCritic {
    /// Accepts every draft once the script runs out
    #[must_use]
    pub fn approving() -> Self {
        Self::always(Vec::new())
    }

    /// Returns `items` for every draft once the script runs out
    #[must_use]
    pub fn always(items: Vec<CritiqueItem>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: items,
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn then(self, response: Result<Vec<CritiqueItem>, GenerationError>) -> Self {
        self.script.lock().push_back(response);
        self
    }

    #[must_use]
    pub fn then_issues(self, issues: &[&str]) -> Self {
        self.then(Ok(issues.iter().map(|i| CritiqueItem::new(*i)).collect()))
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Critic for ScriptedCritic {
    async fn critique(
        &self,
        _request: &ReviewRequest,
        _options: &CallOptions,
    ) -> Result<Vec<CritiqueItem>, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.script.lock().pop_front();
        scripted.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

/// Memory store whose saves can be switched to fail
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_saves: AtomicBool,
}

impl FailingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionStore for FailingStore {
    async fn save(&self, state: &WorkflowState) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        self.inner.save(state).await
    }

    async fn load(&self, session_id: &str) -> Result<Option<WorkflowState>, StoreError> {
        self.inner.load(session_id).await
    }

    async fn delete(&self, session_id: &str) -> Result<bool, StoreError> {
        self.inner.delete(session_id).await
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        self.inner.list().await
    }
}

mockall::mock! {
    pub Store {}

    #[async_trait]
    impl SessionStore for Store {
        async fn save(&self, state: &WorkflowState) -> Result<(), StoreError>;
        async fn load(&self, session_id: &str) -> Result<Option<WorkflowState>, StoreError>;
        async fn delete(&self, session_id: &str) -> Result<bool, StoreError>;
        async fn list(&self) -> Result<Vec<String>, StoreError>;
    }
}

pub fn sample_context() -> DraftContext {
    DraftContext::new(
        "Test Manufacturing Co.",
        "Wakayama",
        "We machine metal parts with ten staff. The plant is on the coast.",
    )
}

/// `disaster_assumption` -> `business_impact`
pub fn two_section_plan() -> WorkflowPlan {
    WorkflowPlan::new(["disaster_assumption", "business_impact"])
        .with_dependency("business_impact", "disaster_assumption")
}

/// Two sections waiting on each other
pub fn cyclic_plan() -> WorkflowPlan {
    two_section_plan().with_dependency("disaster_assumption", "business_impact")
}

/// Orchestrator over an in-memory store
pub fn orchestrator_with(
    generator: Arc<dyn ContentGenerator>,
    critic: Arc<dyn Critic>,
) -> Orchestrator {
    Orchestrator::new(Arc::new(MemoryStore::new()), generator, critic)
}

/// Orchestrator that drafts offline and checks keywords
pub fn offline_orchestrator(config: OrchestratorConfig) -> Orchestrator {
    Orchestrator::new(
        Arc::new(MemoryStore::new()),
        Arc::new(OfflineGenerator::new()),
        Arc::new(KeywordCritic::new()),
    )
    .with_templates(sdo_core::presets::business_continuity_templates())
    .with_config(config)
}
