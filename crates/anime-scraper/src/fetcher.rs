//! HTTP page fetcher with a per-site courtesy delay and retry policy.

use crate::error::{Result, ScrapeError};
use crate::source::Source;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use shared::config::{RetryConfig, SiteConfig};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// When and how long to wait before trying a URL again
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per URL
    pub max_attempts: u32,
    /// Wait after a retryable status is `block_backoff * attempt_number`
    pub block_backoff: Duration,
    /// Wait after a transport-level error
    pub transport_delay: Duration,
    /// Statuses that are retried; any other non-200 status is terminal
    pub retry_statuses: Vec<u16>,
}

impl RetryPolicy {
    /// Single attempt, no waiting
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            block_backoff: Duration::ZERO,
            transport_delay: Duration::ZERO,
            retry_statuses: Vec::new(),
        }
    }

    pub fn is_retryable(&self, status: StatusCode) -> bool {
        self.retry_statuses.contains(&status.as_u16())
    }

    /// Backoff after a retryable status on the given 1-based attempt
    pub fn block_delay(&self, attempt: u32) -> Duration {
        self.block_backoff * attempt
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            block_backoff: Duration::from_millis(config.block_backoff_ms),
            transport_delay: Duration::from_millis(config.transport_delay_ms),
            retry_statuses: config.retry_statuses.clone(),
        }
    }
}

/// Fetches listing pages for a single source
pub struct Fetcher {
    /// HTTP client carrying the source's identifying headers
    client: Client,
    /// Courtesy delay before each network request
    pre_request_delay: Duration,
    /// Retry policy
    retry: RetryPolicy,
    /// Default per-request timeout
    timeout: Duration,
}

impl Fetcher {
    /// Create a fetcher for a source using its site configuration
    pub fn new(source: Source, site: &SiteConfig, timeout: Duration) -> Result<Self> {
        Self::with_policy(
            source,
            Duration::from_millis(site.pre_request_delay_ms),
            RetryPolicy::from(&site.retry),
            timeout,
        )
    }

    pub fn with_policy(
        source: Source,
        pre_request_delay: Duration,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for &(name, value) in source.headers() {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(source.user_agent())
            .default_headers(headers)
            .build()
            .map_err(|e| ScrapeError::Fetch {
                url: source.base_url().to_string(),
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            pre_request_delay,
            retry,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch a page, downgrading every failure to `None`
    pub async fn fetch(&self, url: &str, timeout: Duration) -> Option<String> {
        match self.try_fetch(url, timeout).await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(url = %url, error = %e, "Fetch failed, no document");
                None
            }
        }
    }

    /// Fetch a page, reporting why it could not be fetched
    pub async fn try_fetch(&self, url: &str, timeout: Duration) -> Result<String> {
        if !self.pre_request_delay.is_zero() {
            debug!(delay_ms = self.pre_request_delay.as_millis(), "Courtesy delay");
            sleep(self.pre_request_delay).await;
        }

        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_reason = String::from("no attempt made");

        for attempt in 1..=max_attempts {
            info!(url = %url, attempt = attempt, "Downloading");

            match self.client.get(url).timeout(timeout).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::OK {
                        return response.text().await.map_err(|e| ScrapeError::Fetch {
                            url: url.to_string(),
                            reason: format!("failed to read body: {}", e),
                        });
                    }

                    if !self.retry.is_retryable(status) {
                        return Err(ScrapeError::Fetch {
                            url: url.to_string(),
                            reason: format!("unexpected status {}", status),
                        });
                    }

                    last_reason = format!("blocked with status {}", status);
                    if attempt < max_attempts {
                        let delay = self.retry.block_delay(attempt);
                        warn!(
                            url = %url,
                            status = %status,
                            attempt = attempt,
                            delay_ms = delay.as_millis(),
                            "Request blocked, backing off"
                        );
                        sleep(delay).await;
                    }
                }
                Err(e) => {
                    warn!(url = %url, attempt = attempt, error = %e, "Request error");
                    last_reason = e.to_string();
                    if attempt < max_attempts {
                        sleep(self.retry.transport_delay).await;
                    }
                }
            }
        }

        Err(ScrapeError::Fetch {
            url: url.to_string(),
            reason: format!("{} after {} attempt(s)", last_reason, max_attempts),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            block_backoff: Duration::from_millis(5),
            transport_delay: Duration::from_millis(5),
            retry_statuses: vec![403],
        }
    }

    fn fetcher(source: Source, max_attempts: u32) -> Fetcher {
        Fetcher::with_policy(source, Duration::ZERO, fast_policy(max_attempts), Duration::from_secs(5))
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success_sends_identifying_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/anime/tags/romance"))
            .and(header_exists("accept-language"))
            .and(header_exists("sec-fetch-mode"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/anime/tags/romance", server.uri());
        let body = fetcher(Source::AnimePlanet, 3).fetch(&url, Duration::from_secs(5)).await;
        assert_eq!(body.as_deref(), Some("<html>ok</html>"));
    }

    #[tokio::test]
    async fn test_blocked_status_is_retried_then_gives_up() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .expect(3)
            .mount(&server)
            .await;

        let url = format!("{}/blocked", server.uri());
        let err = fetcher(Source::AnimePlanet, 3)
            .try_fetch(&url, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Fetch { .. }));
        assert!(err.to_string().contains("3 attempt"));
    }

    #[tokio::test]
    async fn test_blocked_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("page"))
            .mount(&server)
            .await;

        let url = format!("{}/list", server.uri());
        let body = fetcher(Source::AnimePlanet, 3).fetch(&url, Duration::from_secs(5)).await;
        assert_eq!(body.as_deref(), Some("page"));
    }

    #[tokio::test]
    async fn test_other_status_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/broken", server.uri());
        let body = fetcher(Source::AnimePlanet, 3).fetch(&url, Duration::from_secs(5)).await;
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn test_transport_error_is_absent_document() {
        // Nothing listens on port 9 locally
        let body = fetcher(Source::AniDb, 2)
            .fetch("http://127.0.0.1:9/anime/", Duration::from_millis(500))
            .await;
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn test_transport_error_is_retried_after_fixed_delay() {
        let policy = RetryPolicy {
            transport_delay: Duration::from_millis(50),
            ..fast_policy(3)
        };
        let fetcher =
            Fetcher::with_policy(Source::AniDb, Duration::ZERO, policy, Duration::from_secs(5))
                .unwrap();

        let started = std::time::Instant::now();
        let err = fetcher
            .try_fetch("http://127.0.0.1:9/anime/", Duration::from_millis(500))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("after 3 attempt(s)"), "{}", err);
        // Two waits between three attempts, none after the last
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::from(&RetryConfig {
            max_attempts: 0,
            block_backoff_ms: 5000,
            transport_delay_ms: 1000,
            retry_statuses: vec![403, 429],
        });
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.block_delay(2), Duration::from_secs(10));
        assert!(policy.is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(!policy.is_retryable(StatusCode::NOT_FOUND));
        assert!(!RetryPolicy::no_retry().is_retryable(StatusCode::FORBIDDEN));
    }
}
