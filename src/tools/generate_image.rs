use super::{Tool, ToolMeta, ToolName, ToolOutput, parse_args};
use crate::context::ToolContext;
use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

const ASPECT_RATIOS: [&str; 5] = ["1:1", "16:9", "9:16", "4:3", "3:4"];

#[derive(Deserialize, Debug)]
struct GenerateImageArgs {
    prompt: String,
    aspect_ratio: Option<String>,
}

pub struct GenerateImageTool;

#[async_trait]
impl Tool for GenerateImageTool {
    fn name(&self) -> ToolName {
        ToolName::GenerateImage
    }

    fn description(&self) -> &'static str {
        "Generate an illustration, figure or photo from a text prompt. The image is saved to the project assets."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {"type": "string"},
                "aspect_ratio": {"type": "string", "enum": ASPECT_RATIOS}
            },
            "required": ["prompt"]
        })
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext<'_>) -> Result<ToolOutput> {
        let args: GenerateImageArgs = parse_args(self.name(), args)?;
        if args.prompt.trim().is_empty() {
            bail!("The image prompt is empty.");
        }
        if let Some(ratio) = args.aspect_ratio.as_deref() {
            if !ASPECT_RATIOS.contains(&ratio) {
                bail!(
                    "Unsupported aspect ratio '{ratio}'. Use one of: {}.",
                    ASPECT_RATIOS.join(", ")
                );
            }
        }
        let image = ctx
            .services
            .generate_image(
                args.prompt.trim(),
                args.aspect_ratio.as_deref(),
                &ctx.execution.image_generation,
            )
            .await?;
        let text = format!(
            "Generated image {} ({}). Refer to it by this id.",
            image.id, image.data.mime_type
        );
        Ok(ToolOutput::with_meta(text, ToolMeta::Image { image }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{StubServices, context_with_draft};

    #[tokio::test]
    async fn test_uses_context_settings() {
        let mut execution = context_with_draft("");
        execution.image_generation.model = "imagen-4".to_string();
        let services = StubServices::default();
        let ctx = ToolContext::new(&execution, &services);

        let output = GenerateImageTool
            .execute(&json!({"prompt": "a brain", "aspect_ratio": "16:9"}), &ctx)
            .await
            .unwrap();
        assert_eq!(services.last_prompt(), "a brain|16:9|imagen-4");
        assert_eq!(
            output.text,
            "Generated image img-1 (image/png). Refer to it by this id."
        );
        assert!(matches!(output.meta, Some(ToolMeta::Image { .. })));
    }

    #[tokio::test]
    async fn test_bad_aspect_ratio() {
        let execution = context_with_draft("");
        let services = StubServices::default();
        let ctx = ToolContext::new(&execution, &services);

        let err = GenerateImageTool
            .execute(&json!({"prompt": "x", "aspect_ratio": "2:1"}), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Unsupported aspect ratio '2:1'"));
    }
}
