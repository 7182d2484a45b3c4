use super::{Tool, ToolName, ToolOutput, parse_args};
use crate::context::{ExecutionContext, ToolContext};
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum Section {
    Draft,
    Canvas,
    Tables,
    Sources,
    #[default]
    All,
}

#[derive(Deserialize, Debug)]
struct ReadProjectContextArgs {
    #[serde(default)]
    section: Section,
}

fn draft_section(execution: &ExecutionContext) -> String {
    if execution.draft_content.trim().is_empty() {
        return "## Draft\nThe draft is empty.".to_string();
    }
    format!("## Draft\n{}", execution.draft_content.trim_end())
}

fn canvas_section(execution: &ExecutionContext) -> String {
    let outline = match &execution.canvas {
        Some(canvas) => canvas.outline(),
        None => "The canvas is empty.".to_string(),
    };
    format!("## Canvas\n{}", outline.trim_end())
}

fn tables_section(execution: &ExecutionContext) -> String {
    if execution.tables.is_empty() {
        return "## Tables\nThere are no tables.".to_string();
    }
    let tables: Vec<String> = execution.tables.iter().map(|t| t.to_markdown()).collect();
    format!("## Tables\n{}", tables.join("\n").trim_end())
}

fn sources_section(execution: &ExecutionContext) -> String {
    if execution.custom_sources.is_empty() {
        return "## Sources\nNo custom sources.".to_string();
    }
    let list: Vec<String> = execution
        .custom_sources
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s))
        .collect();
    format!("## Sources\n{}", list.join("\n"))
}

pub struct ReadProjectContextTool;

#[async_trait]
impl Tool for ReadProjectContextTool {
    fn name(&self) -> ToolName {
        ToolName::ReadProjectContext
    }

    fn description(&self) -> &'static str {
        "Read the current project state: the draft, the canvas outline, the data tables, the custom sources, or all of them."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "section": {
                    "type": "string",
                    "enum": ["draft", "canvas", "tables", "sources", "all"]
                }
            }
        })
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext<'_>) -> Result<ToolOutput> {
        let args: ReadProjectContextArgs = parse_args(self.name(), args)?;
        let execution = ctx.execution;
        let text = match args.section {
            Section::Draft => draft_section(execution),
            Section::Canvas => canvas_section(execution),
            Section::Tables => tables_section(execution),
            Section::Sources => sources_section(execution),
            Section::All => [
                draft_section(execution),
                canvas_section(execution),
                tables_section(execution),
                sources_section(execution),
            ]
            .join("\n\n"),
        };
        Ok(ToolOutput::text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::Table;
    use crate::tools::test_support::{StubServices, context_with_draft};

    #[tokio::test]
    async fn test_all_sections() {
        let mut execution = context_with_draft("# Sleep\nIntro.\n");
        execution.custom_sources = vec!["Lab notes".to_string()];
        execution.tables = vec![Table {
            id: "t".to_string(),
            name: "Data".to_string(),
            columns: vec!["a".to_string()],
            rows: vec![vec!["1".to_string()]],
        }];
        let services = StubServices::default();
        let ctx = ToolContext::new(&execution, &services);

        let output = ReadProjectContextTool
            .execute(&json!({}), &ctx)
            .await
            .unwrap();
        assert_eq!(
            output.text,
            "## Draft\n# Sleep\nIntro.\n\n## Canvas\nThe canvas is empty.\n\n\
             ## Tables\n### Data (t)\n| a |\n|---|\n| 1 |\n\n## Sources\n1. Lab notes"
        );
        assert!(output.meta.is_none());
    }

    #[tokio::test]
    async fn test_single_section() {
        let execution = context_with_draft("");
        let services = StubServices::default();
        let ctx = ToolContext::new(&execution, &services);

        let output = ReadProjectContextTool
            .execute(&json!({"section": "draft"}), &ctx)
            .await
            .unwrap();
        assert_eq!(output.text, "## Draft\nThe draft is empty.");
    }
}
