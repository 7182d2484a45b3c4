//! # Tool Collection
//!
//! The `ToolCollection` is the registry of research tools. It is filled once
//! at startup and then only read: it hands out declarations for the enabled
//! tools and dispatches function calls to the matching implementation.

use crate::context::ToolContext;
use crate::model::{FunctionCall, FunctionDeclaration};
use crate::tools::{
    AnalyzeImageTool, DeepReasonTool, GenerateCanvasTool, GenerateImageTool, InsertCitationTool,
    ManageTablesTool, ReadProjectContextTool, ReadWebPageTool, SearchVideosTool, SearchWebTool,
    Tool, ToolName, ToolOutput, UpdateDraftTool,
};
use std::collections::{BTreeMap, BTreeSet};
use strip_ansi_escapes::strip_str;
use tracing::{info, warn};

/// A collection responsible for registering and dispatching tool calls.
pub struct ToolCollection {
    tools: BTreeMap<ToolName, Box<dyn Tool>>,
}

/// Result of dispatching one function call.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub output: ToolOutput,
    /// The tool that ran, or `None` when the call was refused before reaching
    /// an executor.
    pub executed: Option<ToolName>,
}

impl ToolCollection {
    /// Creates a new, empty `ToolCollection`.
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// The full research tool set.
    pub fn standard() -> Self {
        let mut tools = Self::new();
        tools.register(Box::new(SearchWebTool));
        tools.register(Box::new(UpdateDraftTool));
        tools.register(Box::new(DeepReasonTool));
        tools.register(Box::new(AnalyzeImageTool));
        tools.register(Box::new(GenerateImageTool));
        tools.register(Box::new(GenerateCanvasTool));
        tools.register(Box::new(SearchVideosTool));
        tools.register(Box::new(ReadWebPageTool));
        tools.register(Box::new(ReadProjectContextTool));
        tools.register(Box::new(InsertCitationTool));
        tools.register(Box::new(ManageTablesTool));
        tools
    }

    /// Registers a tool, replacing any tool with the same name. Only used
    /// while bootstrapping.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn get(&self, name: ToolName) -> Option<&dyn Tool> {
        self.tools.get(&name).map(|t| t.as_ref())
    }

    pub fn contains(&self, name: ToolName) -> bool {
        self.tools.contains_key(&name)
    }

    /// Resolves a model-supplied name to a registered tool that is also in
    /// `enabled`.
    pub fn lookup(&self, name: &str, enabled: &BTreeSet<ToolName>) -> Option<&dyn Tool> {
        let name: ToolName = name.parse().ok()?;
        if !enabled.contains(&name) {
            return None;
        }
        self.get(name)
    }

    /// Function declarations of the enabled tools, in name order.
    pub fn declarations(&self, enabled: &BTreeSet<ToolName>) -> Vec<FunctionDeclaration> {
        self.enabled(enabled).map(|t| t.declaration()).collect()
    }

    /// `(name, description)` of the enabled tools for the system prompt.
    pub fn descriptions(&self, enabled: &BTreeSet<ToolName>) -> Vec<(ToolName, &'static str)> {
        self.enabled(enabled)
            .map(|t| (t.name(), t.description()))
            .collect()
    }

    fn enabled<'a>(
        &'a self,
        enabled: &'a BTreeSet<ToolName>,
    ) -> impl Iterator<Item = &'a dyn Tool> + 'a {
        self.tools
            .iter()
            .filter(move |(name, _)| enabled.contains(name))
            .map(|(_, tool)| tool.as_ref())
    }

    /// Executes a function call against the tools enabled in `ctx`.
    /// This function always succeeds from the caller's perspective: unknown
    /// or disabled tools and executor failures are turned into result text
    /// the model can read.
    pub async fn execute_call(&self, call: &FunctionCall, ctx: &ToolContext<'_>) -> Dispatched {
        let Some(tool) = self.lookup(&call.name, &ctx.execution.enabled_tools) else {
            warn!(tool = %call.name, call_id = %call.id, "model requested an unavailable tool");
            return Dispatched {
                output: ToolOutput::text(format!("Tool '{}' is not available.", call.name)),
                executed: None,
            };
        };

        let name = tool.name();
        let output = match tool.execute(&call.args, ctx).await {
            Ok(mut output) => {
                info!(tool = %name, call_id = %call.id, "tool executed");
                output.text = strip_str(&output.text);
                output
            }
            Err(e) => {
                warn!(tool = %name, call_id = %call.id, error = %e, "tool failed");
                ToolOutput::text(format!("Error executing tool: {e}"))
            }
        };
        Dispatched {
            output,
            executed: Some(name),
        }
    }
}

impl Default for ToolCollection {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{StubServices, context_with_draft};
    use serde_json::json;

    fn call(name: &str, args: serde_json::Value) -> FunctionCall {
        FunctionCall {
            id: "c1".to_string(),
            name: name.to_string(),
            args,
        }
    }

    #[test]
    fn test_declarations_follow_enabled_set() {
        let tools = ToolCollection::standard();
        let enabled = BTreeSet::from([ToolName::UpdateDraft, ToolName::SearchWeb]);
        let names: Vec<String> = tools
            .declarations(&enabled)
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["searchWeb", "updateDraft"]);
        assert!(tools.lookup("deepReason", &enabled).is_none());
        assert!(tools.lookup("searchWeb", &enabled).is_some());
    }

    #[tokio::test]
    async fn test_unknown_and_disabled_tools() {
        let tools = ToolCollection::standard();
        let mut execution = context_with_draft("");
        execution.enabled_tools = BTreeSet::from([ToolName::SearchWeb]);
        let services = StubServices::default();
        let ctx = ToolContext::new(&execution, &services);

        for name in ["execute_shell", "updateDraft"] {
            let dispatched = tools.execute_call(&call(name, json!({})), &ctx).await;
            assert_eq!(
                dispatched.output.text,
                format!("Tool '{name}' is not available.")
            );
            assert_eq!(dispatched.executed, None);
        }
    }

    #[tokio::test]
    async fn test_executor_errors_become_text() {
        let tools = ToolCollection::standard();
        let mut execution = context_with_draft("");
        execution.enabled_tools = BTreeSet::from([ToolName::SearchWeb]);
        let services = StubServices::failing();
        let ctx = ToolContext::new(&execution, &services);

        let dispatched = tools
            .execute_call(&call("searchWeb", json!({"query": "x"})), &ctx)
            .await;
        assert_eq!(
            dispatched.output.text,
            "Error executing tool: service unavailable"
        );
        assert_eq!(dispatched.executed, Some(ToolName::SearchWeb));
    }
}
