//! Section templates
//!
//! The orchestrator never branches on a section id. Everything that differs
//! between sections lives in a `SectionTemplate` looked up here when the
//! writer or reviewer runs.

use sdo_kernel::SectionId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Static descriptor of one section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionTemplate {
    pub id: SectionId,
    /// Human-readable heading used in prompts
    pub title: String,
    /// What a good draft of this section contains
    #[serde(default)]
    pub guidance: String,
    /// Terms a compliant draft must mention
    #[serde(default)]
    pub required_keywords: Vec<String>,
}

impl SectionTemplate {
    #[must_use]
    pub fn new(id: impl Into<SectionId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            guidance: String::new(),
            required_keywords: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.guidance = guidance.into();
        self
    }

    #[must_use]
    pub fn with_keywords<I, K>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.required_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Template for an id nobody registered: title derived from the id,
    /// no guidance, no keywords.
    #[must_use]
    pub fn generic(id: &SectionId) -> Self {
        Self::new(id.clone(), title_from_id(id.as_str()))
    }
}

/// `business_impact` -> `Business Impact`
fn title_from_id(id: &str) -> String {
    id.split(['_', '-'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lookup table from section id to template
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<SectionId, Arc<SectionTemplate>>,
}

impl TemplateRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template, replacing any previous one for the same id
    pub fn register(&mut self, template: SectionTemplate) {
        self.templates
            .insert(template.id.clone(), Arc::new(template));
    }

    #[must_use]
    pub fn with(mut self, template: SectionTemplate) -> Self {
        self.register(template);
        self
    }

    #[must_use]
    pub fn get(&self, id: &SectionId) -> Option<&SectionTemplate> {
        self.templates.get(id).map(Arc::as_ref)
    }

    /// Registered template, or a generic one built from the id
    #[must_use]
    pub fn resolve(&self, id: &SectionId) -> SectionTemplate {
        self.get(id)
            .cloned()
            .unwrap_or_else(|| SectionTemplate::generic(id))
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, id: &SectionId) -> bool {
        self.templates.contains_key(id)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl FromIterator<SectionTemplate> for TemplateRegistry {
    fn from_iter<T: IntoIterator<Item = SectionTemplate>>(iter: T) -> Self {
        let mut registry = Self::new();
        for template in iter {
            registry.register(template);
        }
        registry
    }
}
