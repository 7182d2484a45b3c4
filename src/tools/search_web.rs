use super::{Tool, ToolMeta, ToolName, ToolOutput, parse_args};
use crate::context::ToolContext;
use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Deserialize, Debug)]
struct SearchWebArgs {
    query: String,
}

pub struct SearchWebTool;

#[async_trait]
impl Tool for SearchWebTool {
    fn name(&self) -> ToolName {
        ToolName::SearchWeb
    }

    fn description(&self) -> &'static str {
        "Search the web and get a grounded summary with numbered sources. Use it for facts, recent studies and anything you are not sure about."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"}
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext<'_>) -> Result<ToolOutput> {
        let args: SearchWebArgs = parse_args(self.name(), args)?;
        let query = args.query.trim();
        if query.is_empty() {
            bail!("The search query is empty.");
        }
        let outcome = ctx.services.web_search(query).await?;

        let mut text = outcome.summary.trim().to_string();
        if text.is_empty() {
            text = "The search returned no summary.".to_string();
        }
        if !outcome.sources.is_empty() {
            text.push_str("\n\nSources:");
            for (i, source) in outcome.sources.iter().enumerate() {
                text.push_str(&format!("\n[{}] {} - {}", i + 1, source.title, source.uri));
            }
        }
        Ok(ToolOutput::with_meta(
            text,
            ToolMeta::Sources {
                sources: outcome.sources,
            },
        ))
    }
}
