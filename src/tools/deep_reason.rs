use super::{Tool, ToolName, ToolOutput, parse_args};
use crate::context::ToolContext;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Deserialize, Debug)]
struct DeepReasonArgs {
    problem: String,
    context: Option<String>,
}

impl DeepReasonArgs {
    fn prompt(&self) -> String {
        let mut prompt = format!(
            "Think through the following problem carefully and give a structured, well-argued answer.\n\nProblem:\n{}",
            self.problem.trim()
        );
        if let Some(context) = self.context.as_deref().filter(|c| !c.trim().is_empty()) {
            prompt.push_str(&format!("\n\nContext:\n{}", context.trim()));
        }
        prompt
    }
}

pub struct DeepReasonTool;

#[async_trait]
impl Tool for DeepReasonTool {
    fn name(&self) -> ToolName {
        ToolName::DeepReason
    }

    fn description(&self) -> &'static str {
        "Hand a hard problem to a reasoning model with a large thinking budget: planning, analysis, argument structure, trade-offs."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "problem": {"type": "string"},
                "context": {"type": "string", "description": "Background the reasoning model should know."}
            },
            "required": ["problem"]
        })
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext<'_>) -> Result<ToolOutput> {
        let args: DeepReasonArgs = parse_args(self.name(), args)?;
        let answer = ctx.services.deep_reason(&args.prompt()).await?;
        Ok(ToolOutput::text(answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{StubServices, context_with_draft};

    #[tokio::test]
    async fn test_context_is_included_in_prompt() {
        let execution = context_with_draft("");
        let services = StubServices::default();
        let ctx = ToolContext::new(&execution, &services);

        let output = DeepReasonTool
            .execute(
                &json!({"problem": "Plan the essay", "context": "Audience: students"}),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(output.text, "Step 1, then step 2.");
        let prompt = services.last_prompt();
        assert!(prompt.contains("Problem:\nPlan the essay"));
        assert!(prompt.ends_with("Context:\nAudience: students"));
    }
}
