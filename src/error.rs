use std::fmt;
use thiserror::Error;

/// Classified failure of a request to a hosted service, so callers can decide
/// whether waiting and retrying makes sense.
#[derive(Debug, Error)]
#[error("{kind} error: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// 401/403
    Auth,
    /// 429 or quota exhaustion
    RateLimit,
    NotFound,
    Timeout,
    /// Connection refused, DNS failure, reset.
    Network,
    /// 5xx
    ServerError,
    Unknown,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProviderErrorKind::Auth => "authentication",
            ProviderErrorKind::RateLimit => "rate limit",
            ProviderErrorKind::NotFound => "not found",
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::Network => "network",
            ProviderErrorKind::ServerError => "server",
            ProviderErrorKind::Unknown => "provider",
        };
        f.write_str(label)
    }
}

impl ProviderError {
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            401 | 403 => ProviderErrorKind::Auth,
            404 => ProviderErrorKind::NotFound,
            408 => ProviderErrorKind::Timeout,
            429 => ProviderErrorKind::RateLimit,
            500 | 502 | 503 | 504 => ProviderErrorKind::ServerError,
            _ if body.contains("RESOURCE_EXHAUSTED") => ProviderErrorKind::RateLimit,
            _ => ProviderErrorKind::Unknown,
        };
        Self {
            kind,
            status: Some(status),
            message: format!("HTTP {status}: {}", truncate_body(body)),
        }
    }

    pub fn network(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ProviderErrorKind::Timeout
        } else {
            ProviderErrorKind::Network
        };
        Self {
            kind,
            status: None,
            message: err.to_string(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::RateLimit,
            status: Some(429),
            message: message.into(),
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        self.kind == ProviderErrorKind::RateLimit
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    const LIMIT: usize = 300;
    if body.len() <= LIMIT {
        return body.to_string();
    }
    let mut end = LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
