//! # Retry Policy
//!
//! Every request to the hosted model goes through `with_backoff`. Only
//! rate-limit and quota errors are retried, with the delay doubling on every
//! attempt; everything else is returned to the caller immediately.

use crate::error::ProviderError;
use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

const RATE_LIMIT_MARKERS: &[&str] = &[
    "429",
    "resource_exhausted",
    "quota",
    "rate limit",
    "too many requests",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `3` allows four attempts in total.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(2000),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the failed attempt number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

/// Returns true if the error signals that the provider is throttling us. A
/// classified `ProviderError` in the cause chain decides on its own; the
/// message markers are only consulted for unclassified errors.
pub fn is_rate_limited(err: &anyhow::Error) -> bool {
    let mut classified = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<ProviderError>())
        .peekable();
    if classified.peek().is_some() {
        return classified.any(ProviderError::is_rate_limit);
    }
    let text = format!("{err:#}").to_lowercase();
    RATE_LIMIT_MARKERS.iter().any(|marker| text.contains(marker))
}

pub async fn with_backoff<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_retries && is_rate_limited(&err) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use tokio::time::Instant;

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for(1), Duration::from_secs(4));
        assert_eq!(policy.delay_for(2), Duration::from_secs(8));
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(is_rate_limited(&anyhow!(ProviderError::from_status(
            429, "slow down"
        ))));
        assert!(is_rate_limited(
            &anyhow!(ProviderError::rate_limited("quota")).context("sending message")
        ));
        assert!(is_rate_limited(&anyhow!(
            "got status 429 Too Many Requests from upstream"
        )));
        assert!(is_rate_limited(&anyhow!("You exceeded your current quota")));
        assert!(!is_rate_limited(&anyhow!("invalid argument: bad schema")));
        assert!(!is_rate_limited(&anyhow!(ProviderError::from_status(
            500, "oops"
        ))));
    }

    #[test]
    fn test_classified_errors_ignore_message_markers() {
        assert!(!is_rate_limited(&anyhow!(ProviderError::from_status(
            403,
            "PERMISSION_DENIED: this API requires a quota project"
        ))));
        assert!(!is_rate_limited(
            &anyhow!(ProviderError::from_status(400, "retry after 429"))
                .context("rate limit exceeded upstream")
        ));
        assert!(is_rate_limited(&anyhow!(ProviderError::from_status(
            400,
            "RESOURCE_EXHAUSTED"
        ))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_error_mentioning_quota_fails_at_once() {
        let start = Instant::now();
        let mut calls = 0;

        let result: Result<()> = with_backoff(&RetryPolicy::default(), || {
            calls += 1;
            async {
                Err(anyhow!(ProviderError::from_status(
                    403,
                    "PERMISSION_DENIED: this API requires a quota project"
                )))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
        assert_eq!(start.elapsed().as_secs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_three_retries() {
        let start = Instant::now();
        let mut attempts_at = Vec::new();

        let result: Result<()> = with_backoff(&RetryPolicy::default(), || {
            attempts_at.push(start.elapsed().as_secs());
            async { Err(anyhow!(ProviderError::rate_limited("busy"))) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts_at, vec![0, 2, 6, 14]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_when_limit_lifts() {
        let start = Instant::now();
        let mut calls = 0;

        let result = with_backoff(&RetryPolicy::default(), || {
            calls += 1;
            let attempt = calls;
            async move {
                if attempt < 3 {
                    Err(anyhow!("429 RESOURCE_EXHAUSTED"))
                } else {
                    Ok("done")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, "done");
        assert_eq!(calls, 3);
        assert_eq!(start.elapsed().as_secs(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_are_not_retried() {
        let start = Instant::now();
        let mut calls = 0;

        let result: Result<()> = with_backoff(&RetryPolicy::default(), || {
            calls += 1;
            async { Err(anyhow!("invalid api key")) }
        })
        .await;

        assert_eq!(result.unwrap_err().to_string(), "invalid api key");
        assert_eq!(calls, 1);
        assert_eq!(start.elapsed().as_secs(), 0);
    }
}
