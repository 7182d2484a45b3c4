use super::{Tool, ToolMeta, ToolName, ToolOutput, parse_args};
use crate::canvas::{CanvasData, CanvasEdge, CanvasNode};
use crate::context::ToolContext;
use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum CanvasMode {
    #[default]
    Replace,
    Merge,
}

#[derive(Deserialize, Debug)]
struct GenerateCanvasArgs {
    nodes: Vec<CanvasNode>,
    #[serde(default)]
    edges: Vec<CanvasEdge>,
    #[serde(default)]
    mode: CanvasMode,
}

pub struct GenerateCanvasTool;

#[async_trait]
impl Tool for GenerateCanvasTool {
    fn name(&self) -> ToolName {
        ToolName::GenerateCanvas
    }

    fn description(&self) -> &'static str {
        "Draw a concept map on the project canvas as nodes and edges. Use 'merge' to extend the current canvas, 'replace' to start over."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "nodes": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": {"type": "string"},
                            "label": {"type": "string"},
                            "description": {"type": "string"},
                            "color": {"type": "string"}
                        },
                        "required": ["id", "label"]
                    }
                },
                "edges": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "source": {"type": "string", "description": "Id of the source node."},
                            "target": {"type": "string", "description": "Id of the target node."},
                            "label": {"type": "string"}
                        },
                        "required": ["source", "target"]
                    }
                },
                "mode": {"type": "string", "enum": ["replace", "merge"]}
            },
            "required": ["nodes"]
        })
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext<'_>) -> Result<ToolOutput> {
        let args: GenerateCanvasArgs = parse_args(self.name(), args)?;
        if args.nodes.is_empty() && args.mode == CanvasMode::Replace {
            bail!("A canvas needs at least one node.");
        }
        let incoming = CanvasData {
            nodes: args.nodes,
            edges: args.edges,
        };

        let mut canvas = match (args.mode, &ctx.execution.canvas) {
            (CanvasMode::Merge, Some(current)) => {
                let mut merged = current.clone();
                merged.merge(incoming);
                merged
            }
            _ => incoming,
        };
        canvas.validate()?;
        canvas.layout_unplaced();

        let text = format!(
            "Canvas {}: {} nodes, {} edges.",
            match args.mode {
                CanvasMode::Replace => "replaced",
                CanvasMode::Merge => "updated",
            },
            canvas.nodes.len(),
            canvas.edges.len()
        );
        Ok(ToolOutput::with_meta(text, ToolMeta::Canvas { canvas }))
    }
}
