//! PASS/FAIL review parsing
//!
//! Expected shape (loosely):
//!
//! ```text
//! ## Verdict
//! FAIL
//!
//! ## Issues
//! 1. The hazard map is not cited
//!    Reference: "According to the municipal hazard map, ..."
//! 2. Downtime is not quantified
//! ```

use regex::Regex;
use sdo_kernel::CritiqueItem;
use std::sync::OnceLock;

/// Issue raised when a review fails without listing anything parseable
pub const GENERIC_ISSUE: &str =
    "The draft does not meet the review criteria; more specific content is required.";

/// Lines searched for the verdict
const VERDICT_WINDOW: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewOutcome {
    Pass,
    Fail(Vec<CritiqueItem>),
}

fn issue_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\d+\s*[.)]\s*(?P<issue>\S.*?)\s*$").expect("static regex"))
}

fn reference_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?i:reference|参考)\s*[:：]\s*(?P<reference>.*?)\s*$").expect("static regex")
    })
}

/// A line that is just the verdict word, ignoring markdown decoration
fn verdict_of(line: &str) -> Option<bool> {
    let word = line.trim().trim_matches(|c: char| c == '#' || c == '*' || c.is_whitespace());
    if word.eq_ignore_ascii_case("pass") {
        Some(true)
    } else if word.eq_ignore_ascii_case("fail") {
        Some(false)
    } else {
        None
    }
}

/// Parse a reviewer response.
///
/// PASS is recognised only as a bare verdict line within the first few
/// lines; anything else is a failure.
#[must_use]
pub fn parse_review(text: &str) -> ReviewOutcome {
    let passed = text
        .lines()
        .take(VERDICT_WINDOW)
        .find_map(verdict_of)
        .unwrap_or(false);
    if passed {
        return ReviewOutcome::Pass;
    }

    let mut items: Vec<CritiqueItem> = Vec::new();
    for line in text.lines() {
        if let Some(caps) = issue_line().captures(line) {
            items.push(CritiqueItem::new(&caps["issue"]));
        } else if let Some(caps) = reference_line().captures(line) {
            let reference = &caps["reference"];
            if let (Some(last), false) = (items.last_mut(), reference.is_empty()) {
                last.reference = Some(reference.to_string());
            }
        }
    }

    if items.is_empty() {
        items.push(CritiqueItem::new(GENERIC_ISSUE));
    }
    ReviewOutcome::Fail(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pass_verdict() {
        assert_eq!(parse_review("## Verdict\nPASS\n"), ReviewOutcome::Pass);
        assert_eq!(parse_review("**pass**"), ReviewOutcome::Pass);
    }

    #[test]
    fn fail_with_numbered_issues_and_references() {
        let text = "## Verdict\nFAIL\n\n## Issues\n\
                    1. The hazard map is not cited\n   Reference: According to the hazard map\n\
                    2) Downtime is not quantified\n";

        assert_eq!(
            parse_review(text),
            ReviewOutcome::Fail(vec![
                CritiqueItem::new("The hazard map is not cited")
                    .with_reference("According to the hazard map"),
                CritiqueItem::new("Downtime is not quantified"),
            ])
        );
    }

    #[test]
    fn japanese_reference_marker() {
        let text = "FAIL\n1. 具体性が不足\n   参考：ハザードマップによると";
        let ReviewOutcome::Fail(items) = parse_review(text) else {
            panic!("expected failure");
        };
        assert_eq!(items[0].reference.as_deref(), Some("ハザードマップによると"));
    }

    #[test]
    fn fail_without_issues_gets_generic_item() {
        assert_eq!(
            parse_review("FAIL\nNot good enough."),
            ReviewOutcome::Fail(vec![CritiqueItem::new(GENERIC_ISSUE)])
        );
    }

    #[test]
    fn pass_mentioned_in_prose_is_not_a_verdict() {
        let outcome = parse_review("This would not pass review.\n1. Too vague");
        assert_eq!(outcome, ReviewOutcome::Fail(vec![CritiqueItem::new("Too vague")]));
    }
}
