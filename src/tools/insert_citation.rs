use super::{Tool, ToolMeta, ToolName, ToolOutput, parse_args};
use crate::context::ToolContext;
use crate::draft::{self, Citation};
use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Deserialize, Debug)]
struct InsertCitationArgs {
    #[serde(flatten)]
    citation: Citation,
    quote: Option<String>,
}

pub struct InsertCitationTool;

#[async_trait]
impl Tool for InsertCitationTool {
    fn name(&self) -> ToolName {
        ToolName::InsertCitation
    }

    fn description(&self) -> &'static str {
        "Add a numbered reference to the draft's References section. If 'quote' is given and found in the draft, an inline marker like [3] is placed right after it."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "url": {"type": "string"},
                "authors": {"type": "array", "items": {"type": "string"}},
                "year": {"type": "string"},
                "quote": {
                    "type": "string",
                    "description": "Exact text from the draft that the citation supports."
                }
            },
            "required": ["title", "url"]
        })
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext<'_>) -> Result<ToolOutput> {
        let args: InsertCitationArgs = parse_args(self.name(), args)?;
        if args.citation.url.trim().is_empty() {
            bail!("A citation needs a URL.");
        }
        let result = draft::insert_citation(
            &ctx.execution.draft_content,
            &args.citation,
            args.quote.as_deref(),
        );

        let mut text = if result.already_present {
            format!("Source already cited as [{}].", result.number)
        } else {
            format!("Added reference [{}]: {}.", result.number, args.citation.title)
        };
        match (&args.quote, result.marker_placed) {
            (Some(_), true) => text.push_str(" Inline marker placed after the quote."),
            (Some(_), false) => {
                text.push_str(" The quote was not found in the draft, so no inline marker was placed.")
            }
            (None, _) => {}
        }
        Ok(ToolOutput::with_meta(
            text,
            ToolMeta::Draft {
                content: result.draft,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{StubServices, context_with_draft};

    #[tokio::test]
    async fn test_citation_updates_draft_meta() {
        let execution = context_with_draft("Sleep consolidates memory.");
        let services = StubServices::default();
        let ctx = ToolContext::new(&execution, &services);

        let output = InsertCitationTool
            .execute(
                &json!({
                    "title": "Sleep and memory",
                    "url": "https://journal.example/sleep",
                    "year": "2021",
                    "quote": "consolidates memory"
                }),
                &ctx,
            )
            .await
            .unwrap();

        assert_eq!(
            output.text,
            "Added reference [1]: Sleep and memory. Inline marker placed after the quote."
        );
        let Some(ToolMeta::Draft { content }) = output.meta else {
            panic!("expected draft meta");
        };
        assert!(content.starts_with("Sleep consolidates memory [1]."));
        assert!(content.contains("## References\n[1] (2021). Sleep and memory. https://journal.example/sleep"));
    }

    #[tokio::test]
    async fn test_missing_quote_is_reported() {
        let execution = context_with_draft("Body text.");
        let services = StubServices::default();
        let ctx = ToolContext::new(&execution, &services);

        let output = InsertCitationTool
            .execute(
                &json!({"title": "T", "url": "https://x.example", "quote": "absent"}),
                &ctx,
            )
            .await
            .unwrap();
        assert!(output.text.contains("no inline marker was placed"));
    }
}
