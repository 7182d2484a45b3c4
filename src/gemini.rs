//! # Gemini Backend
//!
//! A thin client for the Generative Language `generateContent` REST API and a
//! `ChatModel` built on it. The session keeps the full `contents` list,
//! including model parts verbatim so thought signatures survive, and only
//! appends to it once a request has succeeded.

use crate::error::{ProviderError, truncate_body};
use crate::model::{
    ChatModel, ChatSession, FunctionCall, FunctionDeclaration, HistoryEntry, InlineData,
    ModelResponse, Part, Role, SessionSpec,
};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<WirePart>,
}

impl Content {
    fn text(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![WirePart {
                text: Some(text.into()),
                ..Default::default()
            }],
        }
    }
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WirePart {
    pub text: Option<String>,
    pub thought: Option<bool>,
    pub thought_signature: Option<String>,
    pub inline_data: Option<InlineData>,
    pub function_call: Option<WireFunctionCall>,
    pub function_response: Option<WireFunctionResponse>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct WireFunctionCall {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WireFunctionResponse {
    pub id: Option<String>,
    pub name: String,
    pub response: Value,
}

#[skip_serializing_none]
#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct WireTool {
    pub function_declarations: Option<Vec<FunctionDeclaration>>,
    pub google_search: Option<Map<String, Value>>,
}

#[skip_serializing_none]
#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub thinking_budget: Option<u32>,
}

#[skip_serializing_none]
#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: Option<String>,
}

#[skip_serializing_none]
#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub thinking_config: Option<ThinkingConfig>,
    pub response_modalities: Option<Vec<String>>,
    pub image_config: Option<ImageConfig>,
}

#[skip_serializing_none]
#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub system_instruction: Option<Content>,
    pub tools: Option<Vec<WireTool>>,
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct GroundingChunk {
    pub web: Option<WebChunk>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct WebChunk {
    pub uri: Option<String>,
    pub title: Option<String>,
}

impl GenerateResponse {
    pub fn first_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    /// Concatenated non-thought text of the first candidate.
    pub fn text(&self) -> String {
        self.first_candidate()
            .and_then(|c| c.content.as_ref())
            .map(visible_text)
            .unwrap_or_default()
    }
}

fn visible_text(content: &Content) -> String {
    content
        .parts
        .iter()
        .filter(|p| p.thought != Some(true))
        .filter_map(|p| p.text.as_deref())
        .collect()
}

/// Gemini rejects `$schema` and `additionalProperties` in parameter schemas.
fn strip_unsupported_fields(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.remove("$schema");
            map.remove("additionalProperties");
            for v in map.values_mut() {
                strip_unsupported_fields(v);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                strip_unsupported_fields(v);
            }
        }
        _ => {}
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, base_url: Option<&str>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    async fn post(&self, url: &str, body: &impl Serialize) -> Result<String> {
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::network(&e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::network(&e))?;
        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), &text).into());
        }
        Ok(text)
    }

    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        debug!(model, contents = request.contents.len(), "generateContent");
        let body = self.post(&url, request).await?;
        serde_json::from_str(&body)
            .with_context(|| format!("failed to parse Gemini response: {}", truncate_body(&body)))
    }

    /// Calls a `:predict` endpoint (Imagen) with a raw JSON body.
    pub async fn predict(&self, model: &str, request: &Value) -> Result<Value> {
        let url = format!("{}/models/{}:predict", self.base_url, model);
        debug!(model, "predict");
        let body = self.post(&url, request).await?;
        serde_json::from_str(&body)
            .with_context(|| format!("failed to parse predict response: {}", truncate_body(&body)))
    }
}

pub struct GeminiChatModel {
    client: GeminiClient,
    model: String,
}

impl GeminiChatModel {
    pub fn new(client: GeminiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

impl ChatModel for GeminiChatModel {
    fn start_session(&self, spec: SessionSpec) -> Result<Box<dyn ChatSession>> {
        let function_declarations: Vec<FunctionDeclaration> = spec
            .functions
            .into_iter()
            .map(|mut f| {
                strip_unsupported_fields(&mut f.parameters);
                f
            })
            .collect();
        let tools = (!function_declarations.is_empty()).then(|| {
            vec![WireTool {
                function_declarations: Some(function_declarations),
                google_search: None,
            }]
        });
        let history = spec
            .history
            .iter()
            .map(|HistoryEntry { role, text }| match role {
                Role::User => Content::text("user", text.clone()),
                Role::Model => Content::text("model", text.clone()),
            })
            .collect();

        Ok(Box::new(GeminiSession {
            client: self.client.clone(),
            model: self.model.clone(),
            system_instruction: (!spec.system_instruction.is_empty()).then(|| Content {
                role: None,
                parts: vec![WirePart {
                    text: Some(spec.system_instruction),
                    ..Default::default()
                }],
            }),
            tools,
            generation_config: spec.thinking_budget.map(|budget| GenerationConfig {
                thinking_config: Some(ThinkingConfig {
                    thinking_budget: Some(budget),
                }),
                ..Default::default()
            }),
            history: Mutex::new(history),
        }))
    }
}

pub struct GeminiSession {
    client: GeminiClient,
    model: String,
    system_instruction: Option<Content>,
    tools: Option<Vec<WireTool>>,
    generation_config: Option<GenerationConfig>,
    history: Mutex<Vec<Content>>,
}

fn to_wire(part: Part) -> WirePart {
    match part {
        Part::Text(text) => WirePart {
            text: Some(text),
            ..Default::default()
        },
        Part::InlineData(data) => WirePart {
            inline_data: Some(data),
            ..Default::default()
        },
        Part::FunctionResponse { id, name, response } => WirePart {
            function_response: Some(WireFunctionResponse {
                id: Some(id),
                name,
                response,
            }),
            ..Default::default()
        },
    }
}

/// Reads text and function calls out of a model turn. Calls without an id get
/// a generated one, written back into `content` so the stored history and the
/// function responses we send later agree.
fn interpret(content: &mut Content) -> ModelResponse {
    let mut function_calls = Vec::new();
    for part in content.parts.iter_mut() {
        if let Some(call) = part.function_call.as_mut() {
            let id = call
                .id
                .get_or_insert_with(|| format!("call_{}", uuid::Uuid::new_v4()))
                .clone();
            let args = match &call.args {
                Value::Null => Value::Object(Map::new()),
                other => other.clone(),
            };
            function_calls.push(FunctionCall {
                id,
                name: call.name.trim().to_string(),
                args,
            });
        }
    }
    let text = visible_text(content);
    ModelResponse {
        text: (!text.is_empty()).then_some(text),
        function_calls,
    }
}

#[async_trait]
impl ChatSession for GeminiSession {
    async fn send(&self, parts: Vec<Part>) -> Result<ModelResponse> {
        let user_content = Content {
            role: Some("user".to_string()),
            parts: parts.into_iter().map(to_wire).collect(),
        };
        let mut contents = self
            .history
            .lock()
            .map_err(|_| anyhow!("session history lock poisoned"))?
            .clone();
        contents.push(user_content.clone());

        let request = GenerateRequest {
            contents,
            system_instruction: self.system_instruction.clone(),
            tools: self.tools.clone(),
            generation_config: self.generation_config.clone(),
        };
        let response = self.client.generate_content(&self.model, &request).await?;

        let candidate = response.first_candidate();
        let mut model_content = candidate
            .and_then(|c| c.content.clone())
            .unwrap_or_default();
        model_content.role = Some("model".to_string());
        let reply = interpret(&mut model_content);

        if reply.text.is_none() && reply.function_calls.is_empty() {
            warn!(
                model = %self.model,
                finish_reason = candidate.and_then(|c| c.finish_reason.as_deref()).unwrap_or("unknown"),
                "Gemini returned an empty response"
            );
        }

        let mut history = self
            .history
            .lock()
            .map_err(|_| anyhow!("session history lock poisoned"))?;
        history.push(user_content);
        if !model_content.parts.is_empty() {
            history.push(model_content);
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_interpret_assigns_missing_call_ids() {
        let mut content: Content = serde_json::from_value(json!({
            "role": "model",
            "parts": [
                {"text": "thinking...", "thought": true},
                {"text": "Let me look that up."},
                {"functionCall": {"name": "searchWeb", "args": {"query": "sleep"}}, "thoughtSignature": "abc"},
                {"functionCall": {"id": "given", "name": "updateDraft"}}
            ]
        }))
        .unwrap();

        let reply = interpret(&mut content);

        assert_eq!(reply.text.as_deref(), Some("Let me look that up."));
        assert_eq!(reply.function_calls.len(), 2);
        assert!(reply.function_calls[0].id.starts_with("call_"));
        assert_eq!(reply.function_calls[0].args, json!({"query": "sleep"}));
        assert_eq!(reply.function_calls[1].id, "given");
        assert_eq!(reply.function_calls[1].args, json!({}));
        assert_eq!(
            content.parts[2].function_call.as_ref().unwrap().id.as_deref(),
            Some(reply.function_calls[0].id.as_str())
        );
        assert_eq!(content.parts[2].thought_signature.as_deref(), Some("abc"));
    }

    #[test]
    fn test_request_serializes_in_camel_case() {
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![to_wire(Part::FunctionResponse {
                    id: "c1".to_string(),
                    name: "searchWeb".to_string(),
                    response: json!({"text": "ok"}),
                })],
            }],
            system_instruction: None,
            tools: None,
            generation_config: Some(GenerationConfig {
                thinking_config: Some(ThinkingConfig {
                    thinking_budget: Some(1024),
                }),
                ..Default::default()
            }),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [{"functionResponse": {"id": "c1", "name": "searchWeb", "response": {"text": "ok"}}}]
                }],
                "generationConfig": {"thinkingConfig": {"thinkingBudget": 1024}}
            })
        );
    }

    #[test]
    fn test_schema_stripping() {
        let mut schema = json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {"a": {"type": "object", "additionalProperties": false}}
        });
        strip_unsupported_fields(&mut schema);
        assert_eq!(
            schema,
            json!({"type": "object", "properties": {"a": {"type": "object"}}})
        );
    }
}
