use super::{Tool, ToolMeta, ToolName, ToolOutput, parse_args};
use crate::context::ToolContext;
use crate::tables::{self, TableAction};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};

pub struct ManageTablesTool;

#[async_trait]
impl Tool for ManageTablesTool {
    fn name(&self) -> ToolName {
        ToolName::ManageTables
    }

    fn description(&self) -> &'static str {
        "Create, extend, edit or delete the project's data tables. Tables are addressed by id or name; rows are 0-based."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["create", "add_rows", "update_cell", "delete"]
                },
                "name": {"type": "string", "description": "Name of a new table (create)."},
                "table": {"type": "string", "description": "Id or name of an existing table."},
                "columns": {"type": "array", "items": {"type": "string"}},
                "rows": {
                    "type": "array",
                    "items": {"type": "array", "items": {"type": "string"}}
                },
                "row": {"type": "integer", "description": "0-based row index (update_cell)."},
                "column": {"type": "string"},
                "value": {"type": "string"}
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext<'_>) -> Result<ToolOutput> {
        let action: TableAction = parse_args(self.name(), args)?;
        let (tables, summary) = tables::apply_action(&ctx.execution.tables, action)?;
        Ok(ToolOutput::with_meta(summary, ToolMeta::Tables { tables }))
    }
}
