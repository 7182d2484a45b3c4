//! Page fetching for `readWebPage`: a direct request first, then each
//! configured CORS proxy in order, and finally a crude HTML-to-text pass.

use crate::error::ProviderError;
use anyhow::{Result, anyhow, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

static STRIP_BLOCKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|svg|head|nav|footer)\b.*?</(script|style|noscript|svg|head|nav|footer)>")
        .expect("Invalid regex")
});
static COMMENTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("Invalid regex"));
static BLOCK_BREAKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*(br|/p|/div|/li|/h[1-6]|/tr|/section|/article)\s*/?>")
        .expect("Invalid regex")
});
static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("Invalid regex"));
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\r\f\v]+").expect("Invalid regex"));
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n+").expect("Invalid regex"));

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Reduces an HTML document to readable text, capped at `max_chars`.
pub fn html_to_text(html: &str, max_chars: usize) -> String {
    let text = STRIP_BLOCKS.replace_all(html, " ");
    let text = COMMENTS.replace_all(&text, " ");
    let text = BLOCK_BREAKS.replace_all(&text, "\n");
    let text = TAGS.replace_all(&text, " ");
    let text = decode_entities(&text);
    let text = SPACES.replace_all(&text, " ");
    let text: String = text
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    let text = text.trim();

    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{truncated}\n\n[Content truncated at {max_chars} characters]")
}

/// Substitutes the percent-encoded target into a proxy template such as
/// `https://api.allorigins.win/raw?url={url}`.
pub fn proxied_url(template: &str, target: &str) -> String {
    template.replace("{url}", &urlencoding::encode(target))
}

async fn fetch_once(http: &reqwest::Client, url: &str) -> Result<String> {
    let response = http
        .get(url)
        .header(reqwest::header::USER_AGENT, "Mozilla/5.0 (compatible; PlatiniumResearch/0.1)")
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
    if body.trim().is_empty() {
        bail!("empty response body");
    }
    Ok(body)
}

pub async fn fetch_text(
    http: &reqwest::Client,
    url: &str,
    proxies: &[String],
    max_chars: usize,
) -> Result<String> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("Only http(s) URLs can be read, got '{url}'.");
    }

    let attempts =
        std::iter::once(url.to_string()).chain(proxies.iter().map(|p| proxied_url(p, url)));
    let mut last_error = None;
    for attempt in attempts {
        debug!(url = %attempt, "fetching page");
        match fetch_once(http, &attempt).await {
            Ok(html) => return Ok(html_to_text(&html, max_chars)),
            Err(e) => {
                warn!(url = %attempt, error = %e, "page fetch failed");
                last_error = Some(e);
            }
        }
    }
    Err(last_error
        .unwrap_or_else(|| anyhow!("no fetch attempts were made"))
        .context(format!("Could not read {url}")))
}
