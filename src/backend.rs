use crate::gemini;
use serde::{Deserialize, Serialize};

pub struct BackendConfig {
    pub base_url: String,
    pub api_key_env_var: Option<&'static str>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// The Gemini `generateContent` API, with thinking budgets and grounded search.
    #[default]
    Gemini,
    Openrouter,
    Ollama,
    Openai,
}

impl Backend {
    pub fn config(&self) -> BackendConfig {
        match self {
            Backend::Gemini => BackendConfig {
                base_url: gemini::DEFAULT_BASE_URL.to_string(),
                api_key_env_var: Some("GEMINI_API_KEY"),
            },
            Backend::Openrouter => BackendConfig {
                base_url: "https://openrouter.ai/api/v1/".to_string(),
                api_key_env_var: Some("OPENROUTER_API_KEY"),
            },
            Backend::Ollama => BackendConfig {
                base_url: "http://localhost:11434/v1/".to_string(),
                api_key_env_var: None,
            },
            Backend::Openai => BackendConfig {
                base_url: "https://api.openai.com/v1/".to_string(),
                api_key_env_var: Some("OPENAI_API_KEY"),
            },
        }
    }
}
