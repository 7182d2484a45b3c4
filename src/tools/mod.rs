//! # Tool Trait
//!
//! This module defines the core `Tool` trait that all research tools implement,
//! the closed set of tool names the model may call, and the result type every
//! execution produces.

use crate::canvas::CanvasData;
use crate::context::ToolContext;
use crate::model::FunctionDeclaration;
use crate::services::{GeneratedImage, Source, VideoResult};
use crate::tables::Table;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

pub mod analyze_image;
pub mod deep_reason;
pub mod generate_canvas;
pub mod generate_image;
pub mod insert_citation;
pub mod manage_tables;
pub mod read_project_context;
pub mod read_web_page;
pub mod search_videos;
pub mod search_web;
pub mod update_draft;

#[cfg(test)]
pub(crate) mod test_support;

pub use self::analyze_image::AnalyzeImageTool;
pub use self::deep_reason::DeepReasonTool;
pub use self::generate_canvas::GenerateCanvasTool;
pub use self::generate_image::GenerateImageTool;
pub use self::insert_citation::InsertCitationTool;
pub use self::manage_tables::ManageTablesTool;
pub use self::read_project_context::ReadProjectContextTool;
pub use self::read_web_page::ReadWebPageTool;
pub use self::search_videos::SearchVideosTool;
pub use self::search_web::SearchWebTool;
pub use self::update_draft::UpdateDraftTool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolName {
    SearchWeb,
    UpdateDraft,
    DeepReason,
    AnalyzeImage,
    GenerateImage,
    GenerateCanvas,
    SearchVideos,
    ReadWebPage,
    ReadProjectContext,
    InsertCitation,
    ManageTables,
}

impl ToolName {
    pub const ALL: [ToolName; 11] = [
        ToolName::SearchWeb,
        ToolName::UpdateDraft,
        ToolName::DeepReason,
        ToolName::AnalyzeImage,
        ToolName::GenerateImage,
        ToolName::GenerateCanvas,
        ToolName::SearchVideos,
        ToolName::ReadWebPage,
        ToolName::ReadProjectContext,
        ToolName::InsertCitation,
        ToolName::ManageTables,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::SearchWeb => "searchWeb",
            ToolName::UpdateDraft => "updateDraft",
            ToolName::DeepReason => "deepReason",
            ToolName::AnalyzeImage => "analyzeImage",
            ToolName::GenerateImage => "generateImage",
            ToolName::GenerateCanvas => "generateCanvas",
            ToolName::SearchVideos => "searchVideos",
            ToolName::ReadWebPage => "readWebPage",
            ToolName::ReadProjectContext => "readProjectContext",
            ToolName::InsertCitation => "insertCitation",
            ToolName::ManageTables => "manageTables",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        ToolName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| anyhow!("Unknown tool: {s}"))
    }
}

/// Side-channel payload of a tool result. It reaches the caller through the
/// turn observer and is never sent back to the model.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolMeta {
    Draft { content: String },
    Canvas { canvas: CanvasData },
    Tables { tables: Vec<Table> },
    Image { image: GeneratedImage },
    Sources { sources: Vec<Source> },
    Videos { videos: Vec<VideoResult> },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ToolMeta>,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            meta: None,
        }
    }

    pub fn with_meta(text: impl Into<String>, meta: ToolMeta) -> Self {
        Self {
            text: text.into(),
            meta: Some(meta),
        }
    }

    /// The function-response payload for the model, without `meta`.
    pub fn for_model(&self) -> Value {
        json!({ "text": self.text })
    }

    /// Text for the activity trace; the whole result as JSON when empty.
    pub fn display_text(&self) -> String {
        if !self.text.is_empty() {
            return self.text.clone();
        }
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A self-contained, executable research tool.
///
/// This trait is designed to be object-safe, allowing for dynamic dispatch
/// via `Box<dyn Tool>`.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> ToolName;

    /// One sentence for the system prompt's tool list.
    fn description(&self) -> &'static str;

    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value;

    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration {
            name: self.name().as_str().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }

    /// Runs the tool. Effects on project state are reported through
    /// `ToolOutput::meta`; the context is read-only.
    async fn execute(&self, args: &Value, ctx: &ToolContext<'_>) -> Result<ToolOutput>;
}

/// Deserializes tool arguments into their typed form.
pub(crate) fn parse_args<T: DeserializeOwned>(tool: ToolName, args: &Value) -> Result<T> {
    serde_json::from_value(args.clone())
        .map_err(|e| anyhow!("Invalid arguments provided for {tool}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_strings() {
        for name in ToolName::ALL {
            assert_eq!(name.as_str().parse::<ToolName>().unwrap(), name);
            assert_eq!(
                serde_json::to_value(name).unwrap(),
                Value::String(name.as_str().to_string())
            );
        }
        assert!("execute_shell_command".parse::<ToolName>().is_err());
    }

    #[test]
    fn test_model_payload_drops_meta() {
        let output = ToolOutput::with_meta(
            "Draft updated",
            ToolMeta::Draft {
                content: "a long draft".to_string(),
            },
        );
        let payload = output.for_model();
        assert_eq!(payload, json!({ "text": "Draft updated" }));
        assert!(payload.get("meta").is_none());
    }

    #[test]
    fn test_display_text_falls_back_to_json() {
        let output = ToolOutput::with_meta(
            "",
            ToolMeta::Draft {
                content: "x".to_string(),
            },
        );
        assert_eq!(
            output.display_text(),
            r#"{"text":"","meta":{"kind":"draft","content":"x"}}"#
        );
    }
}
