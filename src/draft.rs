//! # Draft
//!
//! Pure text operations on the project's markdown draft: applying updates,
//! describing what changed, and inserting numbered citations.

use crate::diff;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

const REFERENCES_HEADING: &str = "## References";

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DraftMode {
    #[default]
    Replace,
    Append,
}

pub fn apply_update(current: &str, content: &str, mode: DraftMode) -> String {
    match mode {
        DraftMode::Replace => content.to_string(),
        DraftMode::Append if current.trim().is_empty() => content.to_string(),
        DraftMode::Append => format!("{}\n\n{}", current.trim_end(), content),
    }
}

pub fn short_hash(content: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(content.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    hash[..8].to_string()
}

/// One line describing an edit, e.g. `Draft updated: +3 -1 lines, 812 chars | Hash: 1a2b3c4d`.
pub fn change_summary(old: &str, new: &str) -> String {
    let (added, removed) = diff::line_stats(old, new);
    format!(
        "Draft updated: +{added} -{removed} lines, {} chars | Hash: {}",
        new.chars().count(),
        short_hash(new)
    )
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct Citation {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub authors: Vec<String>,
    pub year: Option<String>,
}

impl Citation {
    fn reference_line(&self, number: usize) -> String {
        let mut line = format!("[{number}] ");
        if !self.authors.is_empty() {
            line.push_str(&self.authors.join(", "));
            line.push(' ');
        }
        if let Some(year) = &self.year {
            line.push_str(&format!("({year}). "));
        } else if !self.authors.is_empty() {
            line.push_str(". ");
        }
        line.push_str(&format!("{}. {}", self.title.trim_end_matches('.'), self.url));
        line
    }
}

/// Outcome of [`insert_citation`].
#[derive(Debug, Clone, PartialEq)]
pub struct CitationInsert {
    pub draft: String,
    pub number: usize,
    pub marker_placed: bool,
    pub already_present: bool,
}

fn reference_count(references: &str) -> usize {
    references
        .lines()
        .filter(|l| {
            let l = l.trim_start();
            l.starts_with('[') && l[1..].split(']').next().is_some_and(|n| n.parse::<usize>().is_ok())
        })
        .count()
}

fn existing_number(references: &str, url: &str) -> Option<usize> {
    references.lines().find_map(|l| {
        let l = l.trim_start();
        if !l.contains(url) {
            return None;
        }
        l.strip_prefix('[')?.split(']').next()?.parse().ok()
    })
}

/// Adds `citation` to the `## References` section (created if missing) and,
/// when `quote` occurs in the body, places an inline `[n]` marker right after
/// its first occurrence. A URL that is already listed reuses its number.
pub fn insert_citation(draft: &str, citation: &Citation, quote: Option<&str>) -> CitationInsert {
    let (body, references) = match draft.find(REFERENCES_HEADING) {
        Some(idx) => (&draft[..idx], &draft[idx + REFERENCES_HEADING.len()..]),
        None => (draft, ""),
    };

    let existing = existing_number(references, &citation.url);
    let number = existing.unwrap_or_else(|| reference_count(references) + 1);

    let mut body = body.trim_end().to_string();
    let mut marker_placed = false;
    if let Some(quote) = quote.map(str::trim).filter(|q| !q.is_empty()) {
        if let Some(pos) = body.find(quote) {
            body.insert_str(pos + quote.len(), &format!(" [{number}]"));
            marker_placed = true;
        }
    }

    let mut reference_lines: Vec<String> = references
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect();
    if existing.is_none() {
        reference_lines.push(citation.reference_line(number));
    }

    let mut out = body;
    if !out.is_empty() {
        out.push_str("\n\n");
    }
    out.push_str(REFERENCES_HEADING);
    out.push('\n');
    out.push_str(&reference_lines.join("\n"));
    out.push('\n');

    CitationInsert {
        draft: out,
        number,
        marker_placed,
        already_present: existing.is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citation(url: &str) -> Citation {
        Citation {
            title: "Sleep and memory".to_string(),
            url: url.to_string(),
            authors: vec!["Walker, M.".to_string()],
            year: Some("2017".to_string()),
        }
    }

    #[test]
    fn test_append_joins_with_blank_line() {
        assert_eq!(apply_update("intro\n", "more", DraftMode::Append), "intro\n\nmore");
        assert_eq!(apply_update("  ", "first", DraftMode::Append), "first");
        assert_eq!(apply_update("old", "new", DraftMode::Replace), "new");
    }

    #[test]
    fn test_change_summary_mentions_stats_and_hash() {
        let summary = change_summary("a\n", "a\nb\n");
        assert!(summary.starts_with("Draft updated: +1 -0 lines"));
        assert!(summary.contains(&format!("Hash: {}", short_hash("a\nb\n"))));
    }

    #[test]
    fn test_first_citation_creates_references() {
        let result = insert_citation(
            "Sleep consolidates memory.",
            &citation("https://a.example"),
            Some("consolidates memory"),
        );
        assert_eq!(result.number, 1);
        assert!(result.marker_placed);
        assert_eq!(
            result.draft,
            "Sleep consolidates memory [1].\n\n## References\n[1] Walker, M. (2017). Sleep and memory. https://a.example\n"
        );
    }

    #[test]
    fn test_second_citation_is_numbered_after_existing() {
        let first = insert_citation("Body.", &citation("https://a.example"), None);
        let second = insert_citation(&first.draft, &citation("https://b.example"), Some("Body"));
        assert_eq!(second.number, 2);
        assert!(second.draft.starts_with("Body [2]."));
        assert!(second.draft.contains("[1] Walker"));
        assert!(second.draft.contains("[2] Walker"));
    }

    #[test]
    fn test_known_url_reuses_number() {
        let first = insert_citation("Body.", &citation("https://a.example"), None);
        let again = insert_citation(&first.draft, &citation("https://a.example"), Some("Body"));
        assert_eq!(again.number, 1);
        assert!(again.already_present);
        assert_eq!(again.draft.matches("https://a.example").count(), 1);
    }

    #[test]
    fn test_missing_quote_leaves_body_alone() {
        let result = insert_citation("Text.", &citation("https://a.example"), Some("absent"));
        assert!(!result.marker_placed);
        assert!(result.draft.starts_with("Text.\n\n## References"));
    }
}
