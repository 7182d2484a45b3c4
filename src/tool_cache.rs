//! Turn-scoped memo of tool results keyed by tool name and arguments.

use crate::model::FunctionCall;
use crate::tools::ToolOutput;
use serde_json::Value;
use sha1::{Digest, Sha1};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    tool: String,
    digest: String,
}

impl CacheKey {
    /// Object keys are sorted before hashing, so `{"a":1,"b":2}` and
    /// `{"b":2,"a":1}` are the same call.
    pub fn for_call(call: &FunctionCall) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(canonical_json(&call.args).as_bytes());
        Self {
            tool: call.name.clone(),
            digest: format!("{:x}", hasher.finalize()),
        }
    }
}

fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let body: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical_json(v)))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        other => other.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct ToolCallCache {
    entries: HashMap<CacheKey, ToolOutput>,
}

impl ToolCallCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&ToolOutput> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: CacheKey, output: ToolOutput) {
        self.entries.insert(key, output);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
