use super::{Tool, ToolMeta, ToolName, ToolOutput, parse_args};
use crate::context::ToolContext;
use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

const DEFAULT_RESULTS: u32 = 5;
const MAX_RESULTS: u32 = 10;

#[derive(Deserialize, Debug)]
struct SearchVideosArgs {
    query: String,
    max_results: Option<u32>,
}

pub struct SearchVideosTool;

#[async_trait]
impl Tool for SearchVideosTool {
    fn name(&self) -> ToolName {
        ToolName::SearchVideos
    }

    fn description(&self) -> &'static str {
        "Find YouTube videos on a topic, such as lectures, talks and explainers."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "max_results": {"type": "integer", "minimum": 1, "maximum": MAX_RESULTS}
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext<'_>) -> Result<ToolOutput> {
        let args: SearchVideosArgs = parse_args(self.name(), args)?;
        if args.query.trim().is_empty() {
            bail!("The video search query is empty.");
        }
        let max_results = args
            .max_results
            .unwrap_or(DEFAULT_RESULTS)
            .clamp(1, MAX_RESULTS);
        let videos = ctx
            .services
            .search_videos(args.query.trim(), max_results)
            .await?;
        if videos.is_empty() {
            return Ok(ToolOutput::text(format!(
                "No videos found for '{}'.",
                args.query.trim()
            )));
        }
        let lines: Vec<String> = videos
            .iter()
            .enumerate()
            .map(|(i, v)| format!("{}. {} ({}) - {}", i + 1, v.title, v.channel, v.url))
            .collect();
        Ok(ToolOutput::with_meta(
            format!("Found {} videos:\n{}", videos.len(), lines.join("\n")),
            ToolMeta::Videos { videos },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{StubServices, context_with_draft};

    #[tokio::test]
    async fn test_result_count_is_clamped() {
        let execution = context_with_draft("");
        let services = StubServices::default();
        let ctx = ToolContext::new(&execution, &services);

        let output = SearchVideosTool
            .execute(&json!({"query": "sleep", "max_results": 50}), &ctx)
            .await
            .unwrap();
        assert_eq!(services.last_prompt(), "sleep|10");
        assert_eq!(
            output.text,
            "Found 1 videos:\n1. Sleep and memory (Lab) - https://www.youtube.com/watch?v=abc"
        );
    }
}
