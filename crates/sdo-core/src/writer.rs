//! Writer step
//!
//! Turns the current section of a `WorkflowState` into a generation request,
//! calls the content generator, and hands back the state with the new draft.
//! The input state is never touched, so a failed call leaves nothing to undo.

use crate::collaborators::{bounded, CallOptions, ContentGenerator, GenerationRequest};
use crate::error::GenerationError;
use crate::templates::TemplateRegistry;
use sdo_kernel::dag::DependencyGraph;
use sdo_kernel::WorkflowState;

pub struct WriterStep<'a> {
    generator: &'a dyn ContentGenerator,
    templates: &'a TemplateRegistry,
}

impl<'a> WriterStep<'a> {
    #[inline]
    #[must_use]
    pub fn new(generator: &'a dyn ContentGenerator, templates: &'a TemplateRegistry) -> Self {
        Self {
            generator,
            templates,
        }
    }

    /// Assemble the request for the state's current section
    pub fn build_request(
        &self,
        state: &WorkflowState,
        graph: &DependencyGraph,
    ) -> Result<GenerationRequest, GenerationError> {
        let section = state
            .current_section
            .clone()
            .ok_or_else(|| GenerationError::Fatal("no current section to draft".into()))?;

        let dependencies = graph
            .dependencies(&section)
            .map_err(|e| GenerationError::Fatal(e.to_string()))?;
        let prior_sections = dependencies
            .iter()
            .filter_map(|dep| {
                state
                    .completed_drafts
                    .get(dep)
                    .map(|text| (dep.clone(), text.clone()))
            })
            .collect();

        Ok(GenerationRequest {
            template: self.templates.resolve(&section),
            section,
            context: state.context.clone(),
            critiques: state.critique_list.clone(),
            user_intent: state.user_intent.clone(),
            prior_sections,
        })
    }

    /// Generate a draft for the current section.
    ///
    /// On success the returned state carries the new `draft_content` and no
    /// `user_intent`; critiques and section statuses are left as they were.
    pub async fn draft(
        &self,
        state: &WorkflowState,
        graph: &DependencyGraph,
        options: &CallOptions,
    ) -> Result<WorkflowState, GenerationError> {
        let request = self.build_request(state, graph)?;

        tracing::debug!(
            session_id = %state.session_id,
            section = %request.section,
            revision = request.is_revision(),
            "invoking content generator"
        );
        let text = bounded(options, self.generator.generate(&request, options)).await?;

        let mut next = state.clone();
        next.draft_content = Some(text);
        next.user_intent = None;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sdo_kernel::{
        CritiqueItem, DraftContext, SectionId, SectionStatus, SessionPolicy, WorkflowPlan,
        WorkflowStatus,
    };

    struct Echo;

    #[async_trait]
    impl ContentGenerator for Echo {
        async fn generate(
            &self,
            request: &GenerationRequest,
            _options: &CallOptions,
        ) -> Result<String, GenerationError> {
            Ok(format!(
                "{} ({} prior, intent {:?})",
                request.template.title,
                request.prior_sections.len(),
                request.user_intent
            ))
        }
    }

    struct Broken;

    #[async_trait]
    impl ContentGenerator for Broken {
        async fn generate(
            &self,
            _request: &GenerationRequest,
            _options: &CallOptions,
        ) -> Result<String, GenerationError> {
            Err(GenerationError::Fatal("unsupported section".into()))
        }
    }

    fn writing_state() -> (WorkflowState, DependencyGraph) {
        let plan = WorkflowPlan::new(["disaster_assumption", "business_impact"])
            .with_dependency("business_impact", "disaster_assumption");
        let graph = DependencyGraph::new(&plan).unwrap();
        let mut state = WorkflowState::new("s1", DraftContext::default(), plan, 3, SessionPolicy::default());

        let current = SectionId::from("business_impact");
        state.sections_status.insert(SectionId::from("disaster_assumption"), SectionStatus::Completed);
        state.completed_drafts.insert(SectionId::from("disaster_assumption"), "Earthquake".into());
        state.sections_status.insert(current.clone(), SectionStatus::InProgress);
        state.current_section = Some(current);
        state.status = WorkflowStatus::Writing;
        state.critique_list = vec![CritiqueItem::new("too short")];
        state.user_intent = Some("add more detail".into());
        (state, graph)
    }

    #[tokio::test]
    async fn draft_consumes_intent_and_keeps_critiques() {
        let (state, graph) = writing_state();
        let registry = TemplateRegistry::new();
        let writer = WriterStep::new(&Echo, &registry);

        let next = writer.draft(&state, &graph, &CallOptions::default()).await.unwrap();

        assert_eq!(
            next.draft_content.as_deref(),
            Some("Business Impact (1 prior, intent Some(\"add more detail\"))")
        );
        assert_eq!(next.user_intent, None);
        assert_eq!(next.critique_list, state.critique_list);
        assert_eq!(next.sections_status, state.sections_status);
    }

    #[tokio::test]
    async fn failure_reports_without_a_new_state() {
        let (state, graph) = writing_state();
        let registry = TemplateRegistry::new();
        let writer = WriterStep::new(&Broken, &registry);

        let err = writer.draft(&state, &graph, &CallOptions::default()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Fatal(_)));
    }

    #[test]
    fn request_without_current_section_is_fatal() {
        let (mut state, graph) = writing_state();
        state.current_section = None;
        let registry = TemplateRegistry::new();
        let writer = WriterStep::new(&Echo, &registry);

        assert!(matches!(
            writer.build_request(&state, &graph),
            Err(GenerationError::Fatal(_))
        ));
    }
}
