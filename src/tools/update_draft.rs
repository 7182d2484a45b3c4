use super::{Tool, ToolMeta, ToolName, ToolOutput, parse_args};
use crate::context::ToolContext;
use crate::draft::{self, DraftMode};
use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Deserialize, Debug)]
struct UpdateDraftArgs {
    content: String,
    #[serde(default)]
    mode: DraftMode,
}

pub struct UpdateDraftTool;

#[async_trait]
impl Tool for UpdateDraftTool {
    fn name(&self) -> ToolName {
        ToolName::UpdateDraft
    }

    fn description(&self) -> &'static str {
        "Write to the project draft document. Use mode 'replace' with the complete new document, or 'append' to add a section at the end. Markdown is supported."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "Markdown text. With 'replace' this must be the whole document."
                },
                "mode": {
                    "type": "string",
                    "enum": ["replace", "append"],
                    "description": "Defaults to 'replace'."
                }
            },
            "required": ["content"]
        })
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext<'_>) -> Result<ToolOutput> {
        let args: UpdateDraftArgs = parse_args(self.name(), args)?;
        if args.content.trim().is_empty() {
            bail!("Draft content must not be empty.");
        }
        let current = &ctx.execution.draft_content;
        let updated = draft::apply_update(current, &args.content, args.mode);
        Ok(ToolOutput::with_meta(
            draft::change_summary(current, &updated),
            ToolMeta::Draft { content: updated },
        ))
    }
}
