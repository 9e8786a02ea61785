//! Prompt rendering for model-backed collaborators

use crate::collaborators::{GenerationRequest, ReviewRequest};
use std::fmt::Write;

/// Writer prompt: applicant facts, interview, revision instructions, requirements.
#[must_use]
pub fn writer_prompt(request: &GenerationRequest) -> String {
    let template = &request.template;
    let context = &request.context;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "You are drafting the \"{}\" section of a business continuity plan.\n",
        template.title
    );
    let _ = writeln!(out, "[Applicant]");
    let _ = writeln!(out, "- Name: {}", context.applicant_name);
    let _ = writeln!(out, "- Location: {}", context.location);
    for (key, value) in &context.extra {
        let _ = writeln!(out, "- {key}: {value}");
    }

    let _ = writeln!(out, "\n[Interview]\n{}", context.interview_transcript.trim());

    if !request.prior_sections.is_empty() {
        let _ = writeln!(out, "\n[Accepted sections]");
        for (section, text) in &request.prior_sections {
            let _ = writeln!(out, "## {section}\n{}", text.trim());
        }
    }

    let _ = writeln!(
        out,
        "\n[Task]\nUsing the interview above, write a draft of \"{}\".",
        template.title
    );
    if !template.guidance.is_empty() {
        let _ = writeln!(out, "{}", template.guidance);
    }

    let revision = revision_instruction(request);
    if !revision.is_empty() {
        let _ = write!(out, "\n{revision}");
    }

    let _ = writeln!(out, "\n[Requirements]");
    if template.required_keywords.is_empty() {
        let _ = writeln!(out, "No specific requirements.");
    } else {
        let _ = writeln!(out, "Required keywords: {}", template.required_keywords.join(", "));
    }

    let _ = writeln!(out, "\nRespond with the draft text only.");
    out
}

/// Numbered critique list plus any human guidance; empty on a first draft.
#[must_use]
pub fn revision_instruction(request: &GenerationRequest) -> String {
    let mut out = String::new();

    if !request.critiques.is_empty() {
        let _ = writeln!(out, "[Address the previous review]");
        for (i, critique) in request.critiques.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, critique.issue);
            if let Some(reference) = &critique.reference {
                let _ = writeln!(out, "   Reference: {reference}");
            }
        }
    }

    if let Some(intent) = &request.user_intent {
        let _ = writeln!(out, "[Reviewer guidance]\n{}", intent.trim());
    }

    out
}

/// Reviewer prompt asking for a PASS/FAIL verdict and numbered issues.
#[must_use]
pub fn reviewer_prompt(request: &ReviewRequest) -> String {
    let template = &request.template;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "You are a certification examiner. Strictly review the draft of the \"{}\" section.\n",
        template.title
    );
    let _ = writeln!(out, "[Draft]\n{}\n", request.draft.trim());

    let _ = writeln!(out, "[Criteria]");
    if template.required_keywords.is_empty() {
        let _ = writeln!(out, "General completeness and specificity.");
    } else {
        let _ = writeln!(out, "Required keywords: {}", template.required_keywords.join(", "));
    }
    if !template.guidance.is_empty() {
        let _ = writeln!(out, "Note: {}", template.guidance);
    }

    let _ = writeln!(
        out,
        "\n[Output format]\n\
         ## Verdict\n\
         PASS or FAIL\n\n\
         ## Issues (FAIL only)\n\
         1. <specific issue>\n   \
         Reference: <example wording>\n"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::SectionTemplate;
    use sdo_kernel::{CritiqueItem, DraftContext, SectionId};
    use std::collections::BTreeMap;

    fn request() -> GenerationRequest {
        GenerationRequest {
            section: SectionId::from("disaster_assumption"),
            template: SectionTemplate::new("disaster_assumption", "Disaster Assumption")
                .with_keywords(["hazard map", "earthquake"]),
            context: DraftContext::new("Test Manufacturing Co.", "Wakayama", "We make metal parts."),
            critiques: Vec::new(),
            user_intent: None,
            prior_sections: BTreeMap::new(),
        }
    }

    #[test]
    fn first_draft_has_no_revision_block() {
        let prompt = writer_prompt(&request());

        assert!(prompt.contains("\"Disaster Assumption\""));
        assert!(prompt.contains("Test Manufacturing Co."));
        assert!(prompt.contains("Required keywords: hazard map, earthquake"));
        assert!(!prompt.contains("[Address the previous review]"));
    }

    #[test]
    fn revision_lists_critiques_and_guidance() {
        let mut req = request();
        req.critiques = vec![
            CritiqueItem::new("Cite the hazard map").with_reference("Nankai Trough, intensity 6+"),
            CritiqueItem::new("Quantify downtime"),
        ];
        req.user_intent = Some("add more detail".into());

        let block = revision_instruction(&req);
        assert!(block.contains("1. Cite the hazard map\n   Reference: Nankai Trough, intensity 6+"));
        assert!(block.contains("2. Quantify downtime"));
        assert!(block.contains("add more detail"));
    }

    #[test]
    fn reviewer_prompt_asks_for_verdict() {
        let review = ReviewRequest {
            section: SectionId::from("pdca"),
            template: SectionTemplate::generic(&SectionId::from("pdca")),
            draft: "Annual review by management.".into(),
        };
        let prompt = reviewer_prompt(&review);
        assert!(prompt.contains("PASS or FAIL"));
        assert!(prompt.contains("Annual review by management."));
    }
}
