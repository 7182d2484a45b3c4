use super::{GeneratedImage, ResearchServices, SearchOutcome, Source, VideoResult, web_page, youtube};
use crate::context::{ImageGenMode, ImageGenSettings};
use crate::gemini::{
    Content, GenerateRequest, GenerateResponse, GenerationConfig, GeminiClient, ImageConfig,
    ThinkingConfig, WirePart, WireTool,
};
use crate::model::InlineData;
use crate::retry::{RetryPolicy, with_backoff};
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::info;

/// Models and limits used by the research services.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub search_model: String,
    pub reasoning_model: String,
    pub reasoning_budget: u32,
    pub vision_model: String,
    pub page_proxies: Vec<String>,
    pub max_page_chars: usize,
    /// Upper bound for `searchVideos`, whatever the model asks for.
    pub max_video_results: u32,
    pub youtube_api_key: Option<String>,
    pub retry: RetryPolicy,
}

/// Research services backed by the Gemini API. Without an API key every
/// model-backed call fails with an explanatory error, which the orchestrator
/// hands to the model as a normal tool error.
pub struct GeminiServices {
    client: Option<GeminiClient>,
    http: reqwest::Client,
    settings: ServiceSettings,
}

impl GeminiServices {
    pub fn new(client: Option<GeminiClient>, http: reqwest::Client, settings: ServiceSettings) -> Self {
        Self {
            client,
            http,
            settings,
        }
    }

    fn client(&self) -> Result<&GeminiClient> {
        self.client
            .as_ref()
            .ok_or_else(|| anyhow!("No Gemini API key is configured for research services."))
    }

    async fn generate(&self, model: &str, request: GenerateRequest) -> Result<GenerateResponse> {
        let client = self.client()?;
        with_backoff(&self.settings.retry, || client.generate_content(model, &request)).await
    }
}

fn user_content(parts: Vec<WirePart>) -> Content {
    Content {
        role: Some("user".to_string()),
        parts,
    }
}

fn text_part(text: impl Into<String>) -> WirePart {
    WirePart {
        text: Some(text.into()),
        ..Default::default()
    }
}

fn grounding_sources(response: &GenerateResponse) -> Vec<Source> {
    let mut sources: Vec<Source> = Vec::new();
    let chunks = response
        .first_candidate()
        .and_then(|c| c.grounding_metadata.as_ref())
        .map(|m| m.grounding_chunks.as_slice())
        .unwrap_or_default();
    for chunk in chunks {
        let Some(web) = &chunk.web else { continue };
        let Some(uri) = &web.uri else { continue };
        if sources.iter().any(|s| &s.uri == uri) {
            continue;
        }
        sources.push(Source {
            title: web.title.clone().unwrap_or_else(|| uri.clone()),
            uri: uri.clone(),
        });
    }
    sources
}

fn first_inline_image(response: &GenerateResponse) -> Option<InlineData> {
    response
        .first_candidate()?
        .content
        .as_ref()?
        .parts
        .iter()
        .find_map(|p| p.inline_data.clone())
}

fn imagen_image(response: &Value) -> Option<InlineData> {
    let prediction = response.get("predictions")?.get(0)?;
    let data = prediction.get("bytesBase64Encoded")?.as_str()?;
    let mime_type = prediction
        .get("mimeType")
        .and_then(Value::as_str)
        .unwrap_or("image/png");
    Some(InlineData {
        mime_type: mime_type.to_string(),
        data: data.to_string(),
    })
}

#[async_trait]
impl ResearchServices for GeminiServices {
    async fn web_search(&self, query: &str) -> Result<SearchOutcome> {
        let request = GenerateRequest {
            contents: vec![user_content(vec![text_part(query)])],
            tools: Some(vec![WireTool {
                function_declarations: None,
                google_search: Some(Map::new()),
            }]),
            ..Default::default()
        };
        let response = self.generate(&self.settings.search_model, request).await?;
        let sources = grounding_sources(&response);
        info!(query, sources = sources.len(), "web search finished");
        Ok(SearchOutcome {
            summary: response.text(),
            sources,
        })
    }

    async fn deep_reason(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![user_content(vec![text_part(prompt)])],
            generation_config: Some(GenerationConfig {
                thinking_config: Some(ThinkingConfig {
                    thinking_budget: Some(self.settings.reasoning_budget),
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let response = self
            .generate(&self.settings.reasoning_model, request)
            .await?;
        Ok(response.text())
    }

    async fn analyze_image(&self, image: &InlineData, question: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![user_content(vec![
                WirePart {
                    inline_data: Some(image.clone()),
                    ..Default::default()
                },
                text_part(question),
            ])],
            ..Default::default()
        };
        let response = self.generate(&self.settings.vision_model, request).await?;
        Ok(response.text())
    }

    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: Option<&str>,
        settings: &ImageGenSettings,
    ) -> Result<GeneratedImage> {
        let data = match settings.mode {
            ImageGenMode::Gemini => {
                let request = GenerateRequest {
                    contents: vec![user_content(vec![text_part(prompt)])],
                    generation_config: Some(GenerationConfig {
                        response_modalities: Some(vec!["TEXT".to_string(), "IMAGE".to_string()]),
                        image_config: aspect_ratio.map(|ratio| ImageConfig {
                            aspect_ratio: Some(ratio.to_string()),
                        }),
                        ..Default::default()
                    }),
                    ..Default::default()
                };
                let response = self.generate(&settings.model, request).await?;
                first_inline_image(&response)
            }
            ImageGenMode::Imagen => {
                let client = self.client()?;
                let body = json!({
                    "instances": [{ "prompt": prompt }],
                    "parameters": {
                        "sampleCount": 1,
                        "aspectRatio": aspect_ratio.unwrap_or("1:1"),
                    }
                });
                let response = with_backoff(&self.settings.retry, || {
                    client.predict(&settings.model, &body)
                })
                .await?;
                imagen_image(&response)
            }
        };
        let Some(data) = data else {
            bail!("The image model returned no image for this prompt.");
        };
        Ok(GeneratedImage {
            id: format!("img-{}", uuid::Uuid::new_v4().simple()),
            data,
            prompt: prompt.to_string(),
        })
    }

    async fn search_videos(&self, query: &str, max_results: u32) -> Result<Vec<VideoResult>> {
        let Some(api_key) = &self.settings.youtube_api_key else {
            bail!("No YouTube API key is configured.");
        };
        let max_results = max_results.min(self.settings.max_video_results.max(1));
        youtube::search(&self.http, api_key, query, max_results).await
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        web_page::fetch_text(
            &self.http,
            url,
            &self.settings.page_proxies,
            self.settings.max_page_chars,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grounding_sources_are_deduplicated() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Answer"}]},
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"uri": "https://a.example", "title": "A"}},
                    {"web": {"uri": "https://a.example", "title": "A again"}},
                    {"web": {"uri": "https://b.example"}},
                    {"retrievedContext": {}}
                ]}
            }]
        }))
        .unwrap();
        let sources = grounding_sources(&response);
        assert_eq!(
            sources,
            vec![
                Source {
                    title: "A".to_string(),
                    uri: "https://a.example".to_string()
                },
                Source {
                    title: "https://b.example".to_string(),
                    uri: "https://b.example".to_string()
                },
            ]
        );
        assert_eq!(response.text(), "Answer");
    }

    #[test]
    fn test_imagen_prediction_is_read() {
        let image = imagen_image(&json!({
            "predictions": [{"bytesBase64Encoded": "AAAA", "mimeType": "image/jpeg"}]
        }))
        .unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.data, "AAAA");
        assert!(imagen_image(&json!({"predictions": []})).is_none());
    }

    #[tokio::test]
    async fn test_missing_key_is_reported() {
        let services = GeminiServices::new(
            None,
            reqwest::Client::new(),
            ServiceSettings {
                search_model: "m".to_string(),
                reasoning_model: "m".to_string(),
                reasoning_budget: 1,
                vision_model: "m".to_string(),
                page_proxies: vec![],
                max_page_chars: 100,
                max_video_results: 5,
                youtube_api_key: None,
                retry: RetryPolicy::default(),
            },
        );
        let err = services.web_search("q").await.unwrap_err();
        assert!(err.to_string().contains("No Gemini API key"));
        let err = services.search_videos("q", 3).await.unwrap_err();
        assert!(err.to_string().contains("YouTube"));
    }
}
