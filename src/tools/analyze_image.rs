use super::{Tool, ToolName, ToolOutput, parse_args};
use crate::context::ToolContext;
use crate::model::InlineData;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "gif"];
const DEFAULT_QUESTION: &str = "Describe this image in detail, including any text, data or diagrams it contains.";

#[derive(Deserialize, Debug)]
struct AnalyzeImageArgs {
    image_id: String,
    question: Option<String>,
}

pub fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}

/// Finds `image_id` in the assets folder, either as a file name or as a stem
/// with one of the known image extensions.
fn asset_path(folder: &Path, image_id: &str) -> Option<PathBuf> {
    if image_id.contains('/') || image_id.contains('\\') || image_id.contains("..") {
        return None;
    }
    let direct = folder.join(image_id);
    if direct.is_file() {
        return Some(direct);
    }
    IMAGE_EXTENSIONS
        .iter()
        .map(|ext| folder.join(format!("{image_id}.{ext}")))
        .find(|p| p.is_file())
}

async fn resolve_image(image_id: &str, ctx: &ToolContext<'_>) -> Result<InlineData> {
    if let Some(image) = ctx.session_images.get(image_id) {
        return Ok(image.clone());
    }
    if let Some(path) = ctx
        .execution
        .assets_folder
        .as_deref()
        .and_then(|folder| asset_path(folder, image_id))
    {
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        return Ok(InlineData {
            mime_type: mime_for_path(&path).to_string(),
            data: STANDARD.encode(bytes),
        });
    }
    bail!("No image with id '{image_id}' in this session or the project assets.")
}

pub struct AnalyzeImageTool;

#[async_trait]
impl Tool for AnalyzeImageTool {
    fn name(&self) -> ToolName {
        ToolName::AnalyzeImage
    }

    fn description(&self) -> &'static str {
        "Look at an uploaded or generated image and answer a question about it."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "image_id": {"type": "string", "description": "Id of a session image or file name in the project assets."},
                "question": {"type": "string"}
            },
            "required": ["image_id"]
        })
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext<'_>) -> Result<ToolOutput> {
        let args: AnalyzeImageArgs = parse_args(self.name(), args)?;
        let image = resolve_image(args.image_id.trim(), ctx).await?;
        let question = args
            .question
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .unwrap_or(DEFAULT_QUESTION);
        let answer = ctx.services.analyze_image(&image, question).await?;
        Ok(ToolOutput::text(answer))
    }
}
