//! # OpenAI-compatible Backend
//!
//! A `ChatModel` for OpenRouter, Ollama and OpenAI built on the streaming
//! chat-completions client. Function responses travel as `tool` messages.
//! The protocol has no thinking budget, so that hint is ignored.

use crate::model::{
    ChatModel, ChatSession, FunctionCall, HistoryEntry, ModelResponse, Part, Role, SessionSpec,
};
use crate::streaming_executor;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use openrouter_api::models::tool::{FunctionDescription, Tool as ApiTool, ToolCall};
use openrouter_api::types::chat::{ChatCompletionRequest, Message};
use openrouter_api::{OpenRouterClient, Ready};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};
use tracing::warn;

pub struct OpenRouterChatModel {
    client: Arc<OpenRouterClient<Ready>>,
    model: String,
}

impl OpenRouterChatModel {
    pub fn new(client: OpenRouterClient<Ready>, model: impl Into<String>) -> Self {
        Self {
            client: Arc::new(client),
            model: model.into(),
        }
    }
}

fn message(role: &str, content: impl Into<String>) -> Message {
    Message {
        role: role.to_string(),
        content: content.into(),
        name: None,
        tool_calls: None,
        tool_call_id: None,
    }
}

impl ChatModel for OpenRouterChatModel {
    fn start_session(&self, spec: SessionSpec) -> Result<Box<dyn ChatSession>> {
        let mut messages = Vec::with_capacity(spec.history.len() + 1);
        if !spec.system_instruction.is_empty() {
            messages.push(message("system", spec.system_instruction));
        }
        for HistoryEntry { role, text } in spec.history {
            let role = match role {
                Role::User => "user",
                Role::Model => "assistant",
            };
            messages.push(message(role, text));
        }
        let tools = spec
            .functions
            .into_iter()
            .map(|f| ApiTool::Function {
                function: FunctionDescription {
                    name: f.name,
                    description: Some(f.description),
                    strict: None,
                    parameters: f.parameters,
                },
            })
            .collect();

        Ok(Box::new(OpenRouterSession {
            client: Arc::clone(&self.client),
            model: self.model.clone(),
            tools,
            messages: Mutex::new(messages),
        }))
    }
}

pub struct OpenRouterSession {
    client: Arc<OpenRouterClient<Ready>>,
    model: String,
    tools: Vec<ApiTool>,
    messages: Mutex<Vec<Message>>,
}

/// Maps outgoing parts to chat messages: text parts become one user message,
/// function responses become `tool` messages.
fn to_messages(parts: Vec<Part>) -> Vec<Message> {
    let mut texts = Vec::new();
    let mut messages = Vec::new();
    for part in parts {
        match part {
            Part::Text(text) => texts.push(text),
            Part::InlineData(data) => {
                warn!(mime_type = %data.mime_type, "inline attachments are not supported by this backend, dropping");
            }
            Part::FunctionResponse { id, name, response } => {
                let content = match response.get("text").and_then(Value::as_str) {
                    Some(text) => text.to_string(),
                    None => response.to_string(),
                };
                messages.push(Message {
                    role: "tool".to_string(),
                    content,
                    name: Some(name),
                    tool_calls: None,
                    tool_call_id: Some(id),
                });
            }
        }
    }
    if !texts.is_empty() {
        messages.push(message("user", texts.join("\n\n")));
    }
    messages
}

fn to_function_call(call: &ToolCall) -> FunctionCall {
    let raw = call.function_call.arguments.trim();
    let args = if raw.is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    };
    FunctionCall {
        id: call.id.clone(),
        name: call.function_call.name.trim().to_string(),
        args,
    }
}

#[async_trait]
impl ChatSession for OpenRouterSession {
    async fn send(&self, parts: Vec<Part>) -> Result<ModelResponse> {
        let outgoing = to_messages(parts);
        let mut messages = self
            .messages
            .lock()
            .map_err(|_| anyhow!("session history lock poisoned"))?
            .clone();
        messages.extend(outgoing.iter().cloned());

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            tools: (!self.tools.is_empty()).then(|| self.tools.clone()),
            stream: Some(true),
            response_format: None,
            provider: None,
            models: None,
            transforms: None,
        };

        let client = Arc::clone(&self.client);
        let response = tokio::spawn(async move {
            streaming_executor::stream_and_collect_response(&client, request).await
        })
        .await??;

        let reply = match &response {
            Some(message) => ModelResponse {
                text: (!message.content.trim().is_empty()).then(|| message.content.clone()),
                function_calls: message
                    .tool_calls
                    .iter()
                    .flatten()
                    .map(to_function_call)
                    .collect(),
            },
            None => {
                warn!(model = %self.model, "model returned an empty response");
                ModelResponse::default()
            }
        };

        let mut history = self
            .messages
            .lock()
            .map_err(|_| anyhow!("session history lock poisoned"))?;
        history.extend(outgoing);
        if let Some(message) = response {
            history.push(message);
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openrouter_api::models::tool::FunctionCall as ApiFunctionCall;
    use serde_json::json;

    #[test]
    fn test_parts_become_tool_and_user_messages() {
        let messages = to_messages(vec![
            Part::FunctionResponse {
                id: "call_1".to_string(),
                name: "searchWeb".to_string(),
                response: json!({"text": "found it"}),
            },
            Part::Text("Go on.".to_string()),
        ]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "tool");
        assert_eq!(messages[0].content, "found it");
        assert_eq!(messages[0].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "Go on.");
    }

    #[test]
    fn test_function_call_arguments() {
        let call = |arguments: &str| ToolCall {
            id: "c".to_string(),
            kind: "function".to_string(),
            function_call: ApiFunctionCall {
                name: " searchWeb ".to_string(),
                arguments: arguments.to_string(),
            },
        };
        let parsed = to_function_call(&call("{\"query\": \"x\"}"));
        assert_eq!(parsed.name, "searchWeb");
        assert_eq!(parsed.args, json!({"query": "x"}));
        assert_eq!(to_function_call(&call("")).args, json!({}));
        assert_eq!(to_function_call(&call("{broken")).args, json!("{broken"));
    }
}
