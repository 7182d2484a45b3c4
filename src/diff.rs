use console::style;
use similar::{ChangeTag, TextDiff};

const CONTEXT_LINES: usize = 2;

/// Counts added and removed lines between two texts.
pub fn line_stats(old: &str, new: &str) -> (usize, usize) {
    let diff = TextDiff::from_lines(old, new);
    diff.iter_all_changes()
        .fold((0, 0), |(added, removed), change| match change.tag() {
            ChangeTag::Insert => (added + 1, removed),
            ChangeTag::Delete => (added, removed + 1),
            ChangeTag::Equal => (added, removed),
        })
}

/// Renders a colored, hunk-grouped diff for the terminal.
pub fn render_diff(old: &str, new: &str) -> String {
    if old == new {
        return "No changes detected.".to_string();
    }

    let diff = TextDiff::from_lines(old, new);
    let mut diff_lines = Vec::new();

    for (hunk_idx, group) in diff.grouped_ops(CONTEXT_LINES).iter().enumerate() {
        if hunk_idx > 0 {
            diff_lines.push(style("...").dim().to_string());
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let line = change.value().trim_end_matches('\n');
                let rendered = match change.tag() {
                    ChangeTag::Delete => style(format!("- {line}")).red().to_string(),
                    ChangeTag::Insert => style(format!("+ {line}")).green().to_string(),
                    ChangeTag::Equal => style(format!("  {line}")).dim().to_string(),
                };
                diff_lines.push(rendered);
            }
        }
    }

    diff_lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_stats() {
        assert_eq!(line_stats("a\nb\n", "a\nc\nd\n"), (2, 1));
        assert_eq!(line_stats("", "one\n"), (1, 0));
        assert_eq!(line_stats("same\n", "same\n"), (0, 0));
    }

    #[test]
    fn test_render_marks_changes() {
        let rendered = strip_ansi_escapes::strip_str(render_diff("a\nb\n", "a\nc\n"));
        assert!(rendered.contains("- b"));
        assert!(rendered.contains("+ c"));
        assert!(rendered.contains("  a"));
    }

    #[test]
    fn test_render_identical() {
        assert_eq!(render_diff("x", "x"), "No changes detected.");
    }
}
