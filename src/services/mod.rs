//! # Research Services
//!
//! The hosted services behind the research tools. Tools only see the
//! `ResearchServices` trait; `GeminiServices` is the production implementation.

use crate::context::ImageGenSettings;
use crate::model::InlineData;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

pub mod gemini;
pub mod web_page;
pub mod youtube;

pub use self::gemini::{GeminiServices, ServiceSettings};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub summary: String,
    pub sources: Vec<Source>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub id: String,
    #[serde(flatten)]
    pub data: InlineData,
    pub prompt: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct VideoResult {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    pub description: String,
    pub url: String,
}

#[async_trait]
pub trait ResearchServices: Send + Sync {
    /// Answers `query` from a grounded web search.
    async fn web_search(&self, query: &str) -> Result<SearchOutcome>;

    /// Runs `prompt` on a reasoning model with a large thinking budget.
    async fn deep_reason(&self, prompt: &str) -> Result<String>;

    async fn analyze_image(&self, image: &InlineData, question: &str) -> Result<String>;

    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: Option<&str>,
        settings: &ImageGenSettings,
    ) -> Result<GeneratedImage>;

    async fn search_videos(&self, query: &str, max_results: u32) -> Result<Vec<VideoResult>>;

    /// Fetches `url` and returns its readable text.
    async fn fetch_page(&self, url: &str) -> Result<String>;
}
