//! # Turn Observer
//!
//! The callback bundle a caller hands to `Orchestrator::send_message`. It is
//! the only way tool effects leave the orchestrator: the caller decides how
//! to persist draft, canvas and table updates.

use crate::canvas::CanvasData;
use crate::context::SessionImages;
use crate::tables::Table;
use crate::tools::{ToolMeta, ToolName};
use serde_json::Value;

/// One entry of the tool activity trace.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolActivity {
    pub call_id: String,
    /// The name as the model sent it, which may not be a known tool.
    pub tool_name: String,
    pub input: Value,
    pub text: String,
    pub meta: Option<ToolMeta>,
}

impl ToolActivity {
    pub fn tool(&self) -> Option<ToolName> {
        self.tool_name.parse().ok()
    }
}

/// Progress callbacks for one turn. All methods have no-op defaults.
///
/// Calls are synchronous and ordered: `on_tool_start` precedes
/// `on_tool_result` for the same call id, except for cache hits, which only
/// get `on_tool_result`.
pub trait TurnObserver: Send + Sync {
    fn on_tool_start(&self, _call_id: &str, _tool_name: &str) {}

    fn on_tool_result(&self, _activity: &ToolActivity) {}

    fn on_draft_update(&self, _content: &str) {}

    fn on_canvas_update(&self, _canvas: &CanvasData) {}

    fn on_tables_update(&self, _tables: &[Table]) {}

    /// Images the tools may refer to by id. Read once per batch of calls.
    fn session_images(&self) -> SessionImages {
        SessionImages::new()
    }

    /// The page currently open in the user's browser, if it differs from the
    /// orchestrator's snapshot.
    fn current_browser_url(&self) -> Option<String> {
        None
    }
}

pub struct NoopObserver;

impl TurnObserver for NoopObserver {}
