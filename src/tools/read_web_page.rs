use super::{Tool, ToolName, ToolOutput, parse_args};
use crate::context::ToolContext;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Deserialize, Debug, Default)]
struct ReadWebPageArgs {
    url: Option<String>,
}

pub struct ReadWebPageTool;

#[async_trait]
impl Tool for ReadWebPageTool {
    fn name(&self) -> ToolName {
        ToolName::ReadWebPage
    }

    fn description(&self) -> &'static str {
        "Read the text of a web page. Without a URL, reads the page currently open in the user's browser."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "Absolute http(s) URL."}
            }
        })
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext<'_>) -> Result<ToolOutput> {
        let args: ReadWebPageArgs = parse_args(self.name(), args)?;
        let url = args
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .or_else(|| ctx.browser_url())
            .ok_or_else(|| anyhow!("No URL was given and no page is open in the browser."))?;
        let text = ctx.services.fetch_page(url).await?;
        Ok(ToolOutput::text(format!("Content of {url}:\n\n{text}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{StubServices, context_with_draft};

    #[tokio::test]
    async fn test_defaults_to_live_browser_url() {
        let mut execution = context_with_draft("");
        execution.current_browser_url = Some("https://stale.example".to_string());
        let services = StubServices::default();
        let mut ctx = ToolContext::new(&execution, &services);
        ctx.browser_url = Some("https://live.example".to_string());

        let output = ReadWebPageTool.execute(&json!({}), &ctx).await.unwrap();
        assert_eq!(
            output.text,
            "Content of https://live.example:\n\nText of https://live.example"
        );
    }

    #[tokio::test]
    async fn test_without_any_url_is_an_error() {
        let execution = context_with_draft("");
        let services = StubServices::default();
        let ctx = ToolContext::new(&execution, &services);

        let err = ReadWebPageTool
            .execute(&json!({"url": ""}), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("No URL was given"));
        assert!(services.prompts.lock().unwrap().is_empty());
    }
}
