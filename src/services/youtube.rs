use super::VideoResult;
use crate::error::ProviderError;
use anyhow::{Context, Result};
use serde::Deserialize;

const SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";

#[derive(Deserialize, Debug, Default)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize, Debug)]
struct SearchItem {
    id: ItemId,
    #[serde(default)]
    snippet: Snippet,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ItemId {
    video_id: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
struct Snippet {
    title: String,
    channel_title: String,
    description: String,
}

fn into_results(response: SearchResponse) -> Vec<VideoResult> {
    response
        .items
        .into_iter()
        .filter_map(|item| {
            let video_id = item.id.video_id?;
            Some(VideoResult {
                url: format!("https://www.youtube.com/watch?v={video_id}"),
                video_id,
                title: item.snippet.title,
                channel: item.snippet.channel_title,
                description: item.snippet.description,
            })
        })
        .collect()
}

pub async fn search(
    http: &reqwest::Client,
    api_key: &str,
    query: &str,
    max_results: u32,
) -> Result<Vec<VideoResult>> {
    let max_results = max_results.to_string();
    let response = http
        .get(SEARCH_URL)
        .query(&[
            ("part", "snippet"),
            ("type", "video"),
            ("maxResults", max_results.as_str()),
            ("q", query),
            ("key", api_key),
        ])
        .send()
        .await
        .map_err(|e| ProviderError::network(&e))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::network(&e))?;
    if !status.is_success() {
        return Err(ProviderError::from_status(status.as_u16(), &body).into());
    }
    let parsed: SearchResponse =
        serde_json::from_str(&body).context("failed to parse YouTube search response")?;
    Ok(into_results(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channels_and_playlists_are_skipped() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"items": [
                {"id": {"kind": "youtube#video", "videoId": "abc"},
                 "snippet": {"title": "Sleep science", "channelTitle": "Lab", "description": "d"}},
                {"id": {"kind": "youtube#channel", "channelId": "xyz"}, "snippet": {"title": "A channel"}}
            ]}"#,
        )
        .unwrap();
        let results = into_results(response);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://www.youtube.com/watch?v=abc");
        assert_eq!(results[0].channel, "Lab");
    }
}
