//! Deterministic offline generator
//!
//! Drafts from the template and context alone, with no model behind it. A
//! first draft covers only every other required keyword; any revision (open
//! critiques or human guidance) covers all of them. Paired with
//! `KeywordCritic` this walks each section through exactly one automatic
//! revision, which is what `sdo simulate` demonstrates.

use crate::collaborators::{CallOptions, ContentGenerator, GenerationRequest};
use crate::error::GenerationError;
use async_trait::async_trait;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGenerator;

impl OfflineGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn compose(request: &GenerationRequest) -> String {
        let template = &request.template;
        let context = &request.context;
        let mut out = String::new();

        let _ = writeln!(out, "{}", template.title);
        let _ = writeln!(
            out,
            "{} ({}) prepared this section from its interview.",
            context.applicant_name, context.location
        );
        if let Some(first) = context.interview_transcript.lines().find(|l| !l.trim().is_empty()) {
            let _ = writeln!(out, "Interview notes: {}", first.trim());
        }
        if !request.prior_sections.is_empty() {
            let names: Vec<&str> = request.prior_sections.keys().map(|s| s.as_str()).collect();
            let _ = writeln!(out, "Builds on: {}.", names.join(", "));
        }

        let revising = request.is_revision();
        let covered: Vec<&str> = template
            .required_keywords
            .iter()
            .enumerate()
            .filter(|(i, _)| revising || i % 2 == 0)
            .map(|(_, k)| k.as_str())
            .collect();
        if !covered.is_empty() {
            let _ = writeln!(out, "Covers: {}.", covered.join("; "));
        }

        if let Some(intent) = &request.user_intent {
            let _ = writeln!(out, "Revised per reviewer guidance: {}", intent.trim());
        }
        out
    }
}

#[async_trait]
impl ContentGenerator for OfflineGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
        options: &CallOptions,
    ) -> Result<String, GenerationError> {
        if options.cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }
        Ok(Self::compose(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::KeywordCritic;
    use crate::templates::SectionTemplate;
    use sdo_kernel::{CritiqueItem, DraftContext, SectionId};
    use std::collections::BTreeMap;

    fn request() -> GenerationRequest {
        GenerationRequest {
            section: SectionId::from("initial_response"),
            template: SectionTemplate::new("initial_response", "Initial Response").with_keywords([
                "evacuation",
                "safety confirmation",
                "emergency contact",
            ]),
            context: DraftContext::new("Test Manufacturing Co.", "Wakayama", "\nTen staff.\n"),
            critiques: Vec::new(),
            user_intent: None,
            prior_sections: BTreeMap::new(),
        }
    }

    #[test]
    fn first_draft_misses_odd_keywords() {
        let draft = OfflineGenerator::compose(&request());
        let keywords = request().template.required_keywords;

        assert!(draft.contains("Interview notes: Ten staff."));
        assert_eq!(KeywordCritic::missing_keywords(&keywords, &draft), vec!["safety confirmation"]);
    }

    #[test]
    fn revision_covers_everything() {
        let mut req = request();
        req.critiques = vec![CritiqueItem::new("missing safety confirmation")];
        let draft = OfflineGenerator::compose(&req);

        assert!(KeywordCritic::missing_keywords(&req.template.required_keywords, &draft).is_empty());
    }
}
