//! # Chat Model
//!
//! The boundary between the orchestrator and a hosted language model.
//! A `ChatModel` opens `ChatSession`s that remember the conversation on their
//! own; the orchestrator only ever hands a session the next batch of parts
//! and reads back either text or function calls.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One prior message supplied by the caller when a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
}

impl HistoryEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Base64 payload with its MIME type, used for attachments and images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// A function the model may call, described with a JSON schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    InlineData(InlineData),
    FunctionResponse {
        id: String,
        name: String,
        response: Value,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub id: String,
    pub name: String,
    pub args: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub text: Option<String>,
    pub function_calls: Vec<FunctionCall>,
}

impl ModelResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            function_calls: Vec::new(),
        }
    }

    pub fn calls(function_calls: Vec<FunctionCall>) -> Self {
        Self {
            text: None,
            function_calls,
        }
    }

    /// The response text, if the model produced anything but whitespace.
    pub fn visible_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Everything a session is configured with when it is opened.
#[derive(Debug, Clone, Default)]
pub struct SessionSpec {
    pub system_instruction: String,
    pub functions: Vec<FunctionDeclaration>,
    pub history: Vec<HistoryEntry>,
    pub thinking_budget: Option<u32>,
}

#[async_trait]
pub trait ChatSession: Send + Sync {
    /// Sends the next user-side content and returns the model's reply.
    ///
    /// A failed send must leave the session history untouched so that the
    /// same parts can be sent again.
    async fn send(&self, parts: Vec<Part>) -> Result<ModelResponse>;
}

pub trait ChatModel: Send + Sync {
    fn start_session(&self, spec: SessionSpec) -> Result<Box<dyn ChatSession>>;
}
