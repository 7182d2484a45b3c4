use crate::context::{ExecutionContext, ImageGenSettings};
use crate::model::InlineData;
use crate::services::{GeneratedImage, ResearchServices, SearchOutcome, Source, VideoResult};
use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::Mutex;

/// Canned research services that record the prompts they receive.
#[derive(Default)]
pub struct StubServices {
    pub prompts: Mutex<Vec<String>>,
    pub fail: bool,
}

impl StubServices {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn record(&self, prompt: impl Into<String>) -> Result<()> {
        self.prompts.lock().unwrap().push(prompt.into());
        if self.fail {
            bail!("service unavailable");
        }
        Ok(())
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ResearchServices for StubServices {
    async fn web_search(&self, query: &str) -> Result<SearchOutcome> {
        self.record(query)?;
        Ok(SearchOutcome {
            summary: format!("Findings about {query}."),
            sources: vec![Source {
                title: "Study".to_string(),
                uri: "https://journal.example/study".to_string(),
            }],
        })
    }

    async fn deep_reason(&self, prompt: &str) -> Result<String> {
        self.record(prompt)?;
        Ok("Step 1, then step 2.".to_string())
    }

    async fn analyze_image(&self, image: &InlineData, question: &str) -> Result<String> {
        self.record(format!("{} {question}", image.mime_type))?;
        Ok("A bar chart.".to_string())
    }

    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: Option<&str>,
        settings: &ImageGenSettings,
    ) -> Result<GeneratedImage> {
        self.record(format!("{prompt}|{}|{}", aspect_ratio.unwrap_or("-"), settings.model))?;
        Ok(GeneratedImage {
            id: "img-1".to_string(),
            data: InlineData {
                mime_type: "image/png".to_string(),
                data: "iVBORw0KGgo=".to_string(),
            },
            prompt: prompt.to_string(),
        })
    }

    async fn search_videos(&self, query: &str, max_results: u32) -> Result<Vec<VideoResult>> {
        self.record(format!("{query}|{max_results}"))?;
        Ok(vec![VideoResult {
            video_id: "abc".to_string(),
            title: "Sleep and memory".to_string(),
            channel: "Lab".to_string(),
            description: "Lecture".to_string(),
            url: "https://www.youtube.com/watch?v=abc".to_string(),
        }])
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        self.record(url)?;
        Ok(format!("Text of {url}"))
    }
}

pub fn context_with_draft(draft: &str) -> ExecutionContext {
    ExecutionContext {
        project_id: "p1".to_string(),
        draft_content: draft.to_string(),
        ..Default::default()
    }
}
