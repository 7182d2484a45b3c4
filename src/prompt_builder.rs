//! # Prompt Builder
//!
//! Assembles the system instruction for a session and turns a raw user prompt
//! plus `--attach` files into the message the orchestrator sends.

use crate::context::ExecutionContext;
use crate::model::InlineData;
use crate::tools::ToolName;
use crate::tools::analyze_image::mime_for_path;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::{Path, PathBuf};

const PREAMBLE: &str = "You are Platinium, a research assistant working inside a research project. \
The project has a markdown draft, a concept-map canvas, data tables and an asset gallery. \
Use the tools to research and to change the project; describing a change in prose does not make it. \
When you have finished, reply with a short summary of what you did.";

/// The system instruction: preamble, enabled tools, knowledge-base sources
/// and, when known, the page open in the user's browser.
pub fn system_prompt(tools: &[(ToolName, &str)], context: &ExecutionContext) -> String {
    let mut prompt = String::from(PREAMBLE);

    if !tools.is_empty() {
        prompt.push_str("\n\nAvailable tools:\n");
        for (name, description) in tools {
            prompt.push_str(&format!("- {name}: {description}\n"));
        }
    }

    if !context.custom_sources.is_empty() {
        prompt.push_str("\nKnowledge base provided by the user:\n");
        for (i, source) in context.custom_sources.iter().enumerate() {
            prompt.push_str(&format!("[{}] {}\n", i + 1, source));
        }
    }

    if let Some(url) = &context.current_browser_url {
        prompt.push_str(&format!(
            "\nThe user currently has {url} open in the browser. Use readWebPage without a URL to read it.\n"
        ));
    }

    prompt.trim_end().to_string()
}

/// A user prompt with its attachments resolved.
#[derive(Debug, Default)]
pub struct PreparedPrompt {
    pub text: String,
    pub images: Vec<InlineData>,
    pub warnings: Vec<String>,
}

fn is_image(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref(),
        Some("png" | "jpg" | "jpeg" | "webp" | "gif")
    )
}

/// Reads `attachments`: images become inline data, everything else is
/// appended to the prompt text. Unreadable files are reported as warnings
/// and otherwise skipped.
pub fn prepare_prompt(original_prompt: &str, attachments: &[PathBuf]) -> PreparedPrompt {
    let mut prepared = PreparedPrompt {
        text: original_prompt.to_string(),
        ..Default::default()
    };
    let mut attached_files_content = String::new();

    for path in attachments {
        if is_image(path) {
            match std::fs::read(path) {
                Ok(bytes) => prepared.images.push(InlineData {
                    mime_type: mime_for_path(path).to_string(),
                    data: STANDARD.encode(bytes),
                }),
                Err(e) => prepared
                    .warnings
                    .push(format!("Could not read {}: {e}", path.display())),
            }
            continue;
        }
        match std::fs::read_to_string(path) {
            Ok(content) => {
                attached_files_content.push_str(&format!(
                    "File: {}\n```\n{}\n```\n",
                    path.display(),
                    content.trim_end()
                ));
            }
            Err(e) => prepared
                .warnings
                .push(format!("Could not read {}: {e}", path.display())),
        }
    }

    if !attached_files_content.is_empty() {
        prepared.text.push_str("\n\nAttached file contents:\n");
        prepared.text.push_str(&attached_files_content);
    }
    prepared
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_system_prompt_sections() {
        let context = ExecutionContext {
            custom_sources: vec!["Walker, Why We Sleep".to_string()],
            current_browser_url: Some("https://example.org/article".to_string()),
            ..Default::default()
        };
        let prompt = system_prompt(&[(ToolName::SearchWeb, "Search the web.")], &context);
        assert!(prompt.starts_with("You are Platinium"));
        assert!(prompt.contains("Available tools:\n- searchWeb: Search the web.\n"));
        assert!(prompt.contains("[1] Walker, Why We Sleep"));
        assert!(prompt.ends_with(
            "The user currently has https://example.org/article open in the browser. Use readWebPage without a URL to read it."
        ));
    }

    #[test]
    fn test_system_prompt_omits_empty_sections() {
        let prompt = system_prompt(&[], &ExecutionContext::default());
        assert_eq!(prompt, PREAMBLE);
    }

    #[test]
    fn test_attachments() {
        let dir = tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        let photo = dir.path().join("photo.PNG");
        std::fs::write(&notes, "line one\n").unwrap();
        std::fs::write(&photo, [1u8, 2, 3]).unwrap();
        let missing = dir.path().join("missing.md");

        let prepared = prepare_prompt("Summarize", &[notes.clone(), photo, missing]);

        assert_eq!(
            prepared.text,
            format!(
                "Summarize\n\nAttached file contents:\nFile: {}\n```\nline one\n```\n",
                notes.display()
            )
        );
        assert_eq!(prepared.images.len(), 1);
        assert_eq!(prepared.images[0].mime_type, "image/png");
        assert_eq!(prepared.images[0].data, "AQID");
        assert_eq!(prepared.warnings.len(), 1);
        assert!(prepared.warnings[0].contains("missing.md"));
    }
}
