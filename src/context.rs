//! # Execution Context
//!
//! The read-only project snapshot every tool call sees. It is taken once when
//! an orchestrator is built and is never updated while a turn runs; tools
//! report changes through `ToolMeta` instead of writing to it.

use crate::canvas::CanvasData;
use crate::model::InlineData;
use crate::services::ResearchServices;
use crate::tables::Table;
use crate::tools::ToolName;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

/// Images produced or uploaded during the session, keyed by image id.
pub type SessionImages = HashMap<String, InlineData>;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageGenMode {
    /// Native image output from a Gemini model.
    #[default]
    Gemini,
    /// The Imagen `:predict` endpoint.
    Imagen,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ImageGenSettings {
    pub mode: ImageGenMode,
    pub model: String,
}

impl Default for ImageGenSettings {
    fn default() -> Self {
        Self {
            mode: ImageGenMode::Gemini,
            model: "gemini-2.5-flash-image".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub project_id: String,
    pub assets_folder: Option<PathBuf>,
    pub draft_content: String,
    pub canvas: Option<CanvasData>,
    pub tables: Vec<Table>,
    /// Knowledge-base entries, in the order the user added them.
    pub custom_sources: Vec<String>,
    pub enabled_tools: BTreeSet<ToolName>,
    pub current_browser_url: Option<String>,
    pub image_generation: ImageGenSettings,
}

impl ExecutionContext {
    pub fn is_enabled(&self, tool: ToolName) -> bool {
        self.enabled_tools.contains(&tool)
    }
}

/// What a tool executor receives: the snapshot plus the live extras read
/// from the caller when a batch of calls starts.
pub struct ToolContext<'a> {
    pub execution: &'a ExecutionContext,
    pub services: &'a dyn ResearchServices,
    pub session_images: SessionImages,
    pub browser_url: Option<String>,
}

impl<'a> ToolContext<'a> {
    pub fn new(execution: &'a ExecutionContext, services: &'a dyn ResearchServices) -> Self {
        Self {
            execution,
            services,
            session_images: SessionImages::new(),
            browser_url: execution.current_browser_url.clone(),
        }
    }

    /// The live browser URL if the caller reported one, otherwise the one in
    /// the snapshot.
    pub fn browser_url(&self) -> Option<&str> {
        self.browser_url
            .as_deref()
            .or(self.execution.current_browser_url.as_deref())
    }
}
