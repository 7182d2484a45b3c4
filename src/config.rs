use crate::backend::Backend;
use crate::context::ImageGenSettings;
use crate::orchestrator::{DEFAULT_MAX_ITERATIONS, DEFAULT_THINKING_BUDGET, OrchestratorSettings};
use crate::required_tools::{self, KeywordRule};
use crate::retry::RetryPolicy;
use crate::tools::ToolName;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    pub model: String,
    /// Overrides the backend's default base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub timeout_seconds: u64,
    pub max_iterations: usize,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Thinking budget for the chat model; 0 leaves it to the model.
    pub thinking_budget: u32,
    pub reasoning_model: String,
    pub reasoning_budget: u32,
    pub vision_model: String,
    pub search_model: String,
    pub enabled_tools: Vec<ToolName>,
    pub enforce_required_tools: bool,
    /// Proxy URL templates tried in order when a page cannot be fetched
    /// directly; `{url}` is replaced by the encoded page URL.
    pub page_proxies: Vec<String>,
    pub max_page_chars: usize,
    pub max_video_results: u32,
    pub gemini_api_key_env_var: String,
    pub youtube_api_key_env_var: String,
    pub debug_tool_calls: bool,
    pub image_generation: ImageGenSettings,
    pub required_tool_rules: Vec<KeywordRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Gemini,
            model: "gemini-2.5-flash".to_string(),
            base_url: None,
            timeout_seconds: 120,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_retries: 3,
            retry_base_delay_ms: 2000,
            thinking_budget: DEFAULT_THINKING_BUDGET,
            reasoning_model: "gemini-2.5-pro".to_string(),
            reasoning_budget: 32768,
            vision_model: "gemini-2.5-flash".to_string(),
            search_model: "gemini-2.5-flash".to_string(),
            enabled_tools: ToolName::ALL.to_vec(),
            enforce_required_tools: true,
            page_proxies: vec![
                "https://api.allorigins.win/raw?url={url}".to_string(),
                "https://corsproxy.io/?url={url}".to_string(),
            ],
            max_page_chars: 20_000,
            max_video_results: 5,
            gemini_api_key_env_var: "GEMINI_API_KEY".to_string(),
            youtube_api_key_env_var: "YOUTUBE_API_KEY".to_string(),
            debug_tool_calls: false,
            image_generation: ImageGenSettings::default(),
            required_tool_rules: required_tools::default_rules(),
        }
    }
}

impl Config {
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.backend.config().base_url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }

    pub fn enabled_tool_set(&self) -> BTreeSet<ToolName> {
        self.enabled_tools.iter().copied().collect()
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            max_iterations: self.max_iterations,
            retry: self.retry_policy(),
            thinking_budget: (self.thinking_budget > 0).then_some(self.thinking_budget),
            required_tools: self
                .enforce_required_tools
                .then(|| self.required_tool_rules.clone()),
        }
    }
}

/// Reads the config at `path`, creating it with defaults if it does not
/// exist. Keys missing from the file are filled with defaults and the
/// complete config is written back, so users can see every option.
pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        let default_config = Config::default();
        let toml_string = toml::to_string_pretty(&default_config)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml_string)?;
        info!(path = %path.display(), "created default config");
        return Ok(default_config);
    }

    let config_string = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&config_string)
        .with_context(|| format!("Invalid config file {}", path.display()))?;

    let final_toml_string = toml::to_string_pretty(&config)?;
    if final_toml_string != config_string {
        fs::write(path, final_toml_string)?;
    }
    Ok(config)
}

pub fn load_or_create() -> Result<Config> {
    let xdg_dirs = xdg::BaseDirectories::new();
    let config_path = xdg_dirs.place_config_file("platinium/config.toml")?;
    load_from(&config_path)
}
