//! # Required Tools
//!
//! A keyword heuristic that decides which state-changing tools a request
//! implies, so the orchestrator can push the model to actually call them
//! before it declares the turn finished. False positives and negatives are
//! expected; the rules are plain configuration.

use crate::tools::ToolName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Requires `tool` when the lowercased input contains any of `keywords` and,
/// if `qualifiers` is non-empty, also one of `qualifiers`. Words match at a
/// word start, so "graphs" counts for "graph" but "paragraph" does not.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct KeywordRule {
    pub tool: ToolName,
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qualifiers: Vec<String>,
}

impl KeywordRule {
    fn new(tool: ToolName, keywords: &[&str], qualifiers: &[&str]) -> Self {
        Self {
            tool,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            qualifiers: qualifiers.iter().map(|q| q.to_string()).collect(),
        }
    }

    fn matches(&self, text: &str) -> bool {
        let contains_any = |words: &[String]| {
            words
                .iter()
                .any(|w| contains_word_start(text, &w.to_lowercase()))
        };
        contains_any(&self.keywords) && (self.qualifiers.is_empty() || contains_any(&self.qualifiers))
    }
}

fn contains_word_start(text: &str, needle: &str) -> bool {
    !needle.is_empty()
        && text.match_indices(needle).any(|(i, _)| {
            text[..i]
                .chars()
                .next_back()
                .is_none_or(|c| !c.is_alphanumeric())
        })
}

pub fn default_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new(
            ToolName::UpdateDraft,
            &["draft", "write", "paper", "report"],
            &[],
        ),
        KeywordRule::new(
            ToolName::GenerateCanvas,
            &["canvas", "diagram", "graph", "map", "visualize"],
            &[],
        ),
        KeywordRule::new(ToolName::DeepReason, &["reason", "deep", "think", "plan"], &[]),
        KeywordRule::new(
            ToolName::GenerateImage,
            &["create", "generate"],
            &["image", "picture", "photo"],
        ),
    ]
}

/// Tools a turn still owes. It only ever shrinks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredToolSet {
    pending: BTreeSet<ToolName>,
}

impl RequiredToolSet {
    pub fn detect(input: &str, rules: &[KeywordRule]) -> Self {
        let text = input.to_lowercase();
        Self {
            pending: rules
                .iter()
                .filter(|rule| rule.matches(&text))
                .map(|rule| rule.tool)
                .collect(),
        }
    }

    pub fn mark_executed(&mut self, tool: ToolName) {
        self.pending.remove(&tool);
    }

    /// Pending tools that `available` says can actually be called.
    pub fn missing(&self, available: impl Fn(ToolName) -> bool) -> Vec<ToolName> {
        self.pending.iter().copied().filter(|t| available(*t)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules() {
        let rules = default_rules();
        let set = RequiredToolSet::detect(
            "Search for recent studies and WRITE a summary paragraph",
            &rules,
        );
        assert_eq!(set.missing(|_| true), vec![ToolName::UpdateDraft]);

        let set = RequiredToolSet::detect("Generate a picture of a neuron", &rules);
        assert_eq!(set.missing(|_| true), vec![ToolName::GenerateImage]);

        let set = RequiredToolSet::detect("Summarize this paragraph", &rules);
        assert!(set.is_empty());

        // "create" alone is not enough for an image.
        let set = RequiredToolSet::detect("create a list", &rules);
        assert!(set.is_empty());
    }

    #[test]
    fn test_missing_respects_availability_and_execution() {
        let rules = default_rules();
        let mut set = RequiredToolSet::detect("draft a plan on the canvas", &rules);
        assert_eq!(
            set.missing(|_| true),
            vec![
                ToolName::UpdateDraft,
                ToolName::DeepReason,
                ToolName::GenerateCanvas
            ]
        );
        set.mark_executed(ToolName::UpdateDraft);
        assert_eq!(
            set.missing(|t| t != ToolName::DeepReason),
            vec![ToolName::GenerateCanvas]
        );
    }

    #[test]
    fn test_rules_load_from_toml() {
        #[derive(Deserialize)]
        struct Rules {
            rules: Vec<KeywordRule>,
        }
        let rules = toml::from_str::<Rules>(
            r#"
            [[rules]]
            tool = "manageTables"
            keywords = ["table", "spreadsheet"]
            "#,
        )
        .unwrap()
        .rules;
        let set = RequiredToolSet::detect("Put this in a Spreadsheet", &rules);
        assert_eq!(set.missing(|_| true), vec![ToolName::ManageTables]);
    }
}
