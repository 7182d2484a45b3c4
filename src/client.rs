//! Builds the chat model and research services from the config. API keys are
//! read from the environment variables the config names.

use crate::backend::Backend;
use crate::config::Config;
use crate::gemini::{GeminiChatModel, GeminiClient};
use crate::model::ChatModel;
use crate::openrouter::OpenRouterChatModel;
use crate::services::{GeminiServices, ResearchServices, ServiceSettings};
use anyhow::{Context, Result, bail};
use openrouter_api::{OpenRouterClient, Ready};
use std::sync::Arc;
use tracing::warn;

fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub fn initialize_openrouter_client(config: &Config) -> Result<OpenRouterClient<Ready>> {
    let api_key = match config.backend.config().api_key_env_var {
        Some(env_var) => match env_key(env_var) {
            Some(val) => val,
            None => bail!("environment variable {} not set", env_var),
        },
        // Local servers ignore the key, but the client requires one.
        None => "sk-local".to_string(),
    };
    let client = OpenRouterClient::new()
        .with_base_url(&config.base_url())?
        .with_timeout(config.timeout())
        .with_api_key(api_key)?;
    Ok(client)
}

fn gemini_client(config: &Config, base_url: Option<&str>) -> Result<Option<GeminiClient>> {
    match env_key(&config.gemini_api_key_env_var) {
        Some(key) => Ok(Some(GeminiClient::new(&key, base_url, config.timeout())?)),
        None => Ok(None),
    }
}

pub fn initialize_chat_model(config: &Config) -> Result<Box<dyn ChatModel>> {
    match config.backend {
        Backend::Gemini => {
            let client = gemini_client(config, config.base_url.as_deref())?.with_context(|| {
                format!(
                    "environment variable {} not set",
                    config.gemini_api_key_env_var
                )
            })?;
            Ok(Box::new(GeminiChatModel::new(client, &config.model)))
        }
        Backend::Openrouter | Backend::Ollama | Backend::Openai => {
            let client = initialize_openrouter_client(config)?;
            Ok(Box::new(OpenRouterChatModel::new(client, &config.model)))
        }
    }
}

/// The research services always talk to Gemini. Without a Gemini key the
/// model-backed tools report an error when called.
pub fn initialize_services(config: &Config) -> Result<Arc<dyn ResearchServices>> {
    let gemini_base_url = match config.backend {
        Backend::Gemini => config.base_url.as_deref(),
        _ => None,
    };
    let client = gemini_client(config, gemini_base_url)?;
    if client.is_none() {
        warn!(
            env_var = %config.gemini_api_key_env_var,
            "no Gemini API key, research services are unavailable"
        );
    }
    let http = match &client {
        Some(client) => client.http().clone(),
        None => reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .context("failed to build HTTP client")?,
    };
    let settings = ServiceSettings {
        search_model: config.search_model.clone(),
        reasoning_model: config.reasoning_model.clone(),
        reasoning_budget: config.reasoning_budget,
        vision_model: config.vision_model.clone(),
        page_proxies: config.page_proxies.clone(),
        max_page_chars: config.max_page_chars,
        max_video_results: config.max_video_results,
        youtube_api_key: env_key(&config.youtube_api_key_env_var),
        retry: config.retry_policy(),
    };
    Ok(Arc::new(GeminiServices::new(client, http, settings)))
}
