//! Keyword compliance critic
//!
//! A deterministic `Critic` that raises one critique per required keyword the
//! draft does not mention. Matching ignores case and whitespace, which also
//! catches keywords split across line breaks.

use crate::collaborators::{CallOptions, Critic, ReviewRequest};
use crate::error::GenerationError;
use async_trait::async_trait;
use sdo_kernel::CritiqueItem;

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordCritic;

impl KeywordCritic {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Required keywords missing from `draft`, in template order
    #[must_use]
    pub fn missing_keywords<'k>(keywords: &'k [String], draft: &str) -> Vec<&'k str> {
        let haystack = normalize(draft);
        keywords
            .iter()
            .filter(|keyword| !haystack.contains(&normalize(keyword)))
            .map(String::as_str)
            .collect()
    }

    /// Share of required keywords present, 0 to 100
    #[must_use]
    pub fn coverage(keywords: &[String], draft: &str) -> u8 {
        if keywords.is_empty() {
            return 100;
        }
        let found = keywords.len() - Self::missing_keywords(keywords, draft).len();
        u8::try_from(found * 100 / keywords.len()).unwrap_or(100)
    }
}

fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[async_trait]
impl Critic for KeywordCritic {
    async fn critique(
        &self,
        request: &ReviewRequest,
        _options: &CallOptions,
    ) -> Result<Vec<CritiqueItem>, GenerationError> {
        let template = &request.template;
        let critiques = Self::missing_keywords(&template.required_keywords, &request.draft)
            .into_iter()
            .map(|keyword| {
                let item = CritiqueItem::new(format!(
                    "The draft of \"{}\" does not mention \"{keyword}\".",
                    template.title
                ));
                if template.guidance.is_empty() {
                    item
                } else {
                    item.with_reference(template.guidance.clone())
                }
            })
            .collect();
        Ok(critiques)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::SectionTemplate;
    use sdo_kernel::SectionId;

    fn keywords() -> Vec<String> {
        vec!["hazard map".into(), "Earthquake".into(), "seismic intensity".into()]
    }

    #[test]
    fn matching_ignores_case_and_line_breaks() {
        let draft = "Per the municipal hazard\nmap, an EARTHQUAKE of seismic\n intensity 6 is assumed.";
        assert!(KeywordCritic::missing_keywords(&keywords(), draft).is_empty());
        assert_eq!(KeywordCritic::coverage(&keywords(), draft), 100);
    }

    #[test]
    fn reports_missing_in_template_order() {
        let draft = "Flooding is assumed.";
        assert_eq!(
            KeywordCritic::missing_keywords(&keywords(), draft),
            vec!["hazard map", "Earthquake", "seismic intensity"]
        );
        assert_eq!(KeywordCritic::coverage(&keywords(), "earthquake"), 33);
    }

    #[tokio::test]
    async fn one_critique_per_missing_keyword() {
        let request = ReviewRequest {
            section: SectionId::from("disaster_assumption"),
            template: SectionTemplate::new("disaster_assumption", "Disaster Assumption")
                .with_guidance("Cite the hazard map.")
                .with_keywords(keywords()),
            draft: "An earthquake is assumed.".into(),
        };

        let items = KeywordCritic::new()
            .critique(&request, &CallOptions::default())
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert!(items[0].issue.contains("hazard map"));
        assert_eq!(items[0].reference.as_deref(), Some("Cite the hazard map."));
        assert!(!items[0].is_resolved);
    }
}
