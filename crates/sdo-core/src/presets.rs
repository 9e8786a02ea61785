//! Built-in section presets
//!
//! The business continuity plan: twelve sections drafted in a fixed priority
//! order, with the assumed disaster feeding impact analysis, measures and
//! everything downstream of them.

use crate::templates::{SectionTemplate, TemplateRegistry};
use sdo_kernel::WorkflowPlan;

/// (id, title, guidance, required keywords), in priority order
const BUSINESS_CONTINUITY_SECTIONS: &[(&str, &str, &str, &[&str])] = &[
    (
        "applicant_info",
        "Applicant Information",
        "Identify the business and the person responsible for the plan.",
        &["company name", "representative", "address"],
    ),
    (
        "business_overview",
        "Business Overview",
        "Describe what the business does and who depends on it.",
        &["products", "customers", "employees"],
    ),
    (
        "disaster_assumption",
        "Disaster Assumption",
        "State the natural disasters assumed for the site, citing the public hazard map.",
        &["hazard map", "earthquake", "seismic intensity"],
    ),
    (
        "business_impact",
        "Impact on Business Activities",
        "Explain the assumed disaster's effect on each of the four management resources.",
        &["personnel", "facilities", "cash flow", "information"],
    ),
    (
        "initial_response",
        "Initial Response",
        "Describe the first actions after a disaster strikes, in order.",
        &["evacuation", "safety confirmation", "emergency contact"],
    ),
    (
        "measures",
        "Advance Measures",
        "List concrete measures per management resource, each with an owner.",
        &["personnel", "facilities", "funding", "information"],
    ),
    (
        "implementation_timeline",
        "Implementation Timeline",
        "Give a start date and a deadline for each measure.",
        &["start date", "deadline"],
    ),
    (
        "resource_allocation",
        "Human and Material Resources",
        "Name who carries out each measure and what it costs.",
        &["responsible person", "budget"],
    ),
    (
        "communication_plan",
        "Communication Plan",
        "Explain how staff, customers and suppliers are kept informed during a disruption.",
        &["contact list", "customers", "suppliers"],
    ),
    (
        "training_plan",
        "Training and Education",
        "Describe drills and education that keep the plan usable.",
        &["drill", "annual"],
    ),
    (
        "pdca",
        "PDCA System",
        "Explain how management reviews and improves the plan every year.",
        &["review", "management", "annual"],
    ),
    (
        "review_process",
        "Review and Improvement",
        "Describe how review findings feed back into the plan.",
        &["review", "improvement"],
    ),
];

/// (section, requires)
const BUSINESS_CONTINUITY_DEPENDENCIES: &[(&str, &str)] = &[
    ("business_impact", "disaster_assumption"),
    ("initial_response", "disaster_assumption"),
    ("measures", "disaster_assumption"),
    ("measures", "business_impact"),
    ("pdca", "measures"),
    ("implementation_timeline", "measures"),
    ("resource_allocation", "measures"),
    ("communication_plan", "initial_response"),
    ("training_plan", "measures"),
    ("training_plan", "communication_plan"),
    ("review_process", "pdca"),
];

/// Priority order and dependency map of the business continuity plan
#[must_use]
pub fn business_continuity_plan() -> WorkflowPlan {
    BUSINESS_CONTINUITY_DEPENDENCIES.iter().fold(
        WorkflowPlan::new(BUSINESS_CONTINUITY_SECTIONS.iter().map(|(id, ..)| *id)),
        |plan, (section, requires)| plan.with_dependency(*section, *requires),
    )
}

/// Templates for every business continuity section
#[must_use]
pub fn business_continuity_templates() -> TemplateRegistry {
    BUSINESS_CONTINUITY_SECTIONS
        .iter()
        .map(|(id, title, guidance, keywords)| {
            SectionTemplate::new(*id, *title)
                .with_guidance(*guidance)
                .with_keywords(keywords.iter().copied())
        })
        .collect()
}
