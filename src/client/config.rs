//! Client configuration options.

use std::time::Duration;

use reqwest::Method;
use url::Url;

/// Default base URL for API requests.
pub const DEFAULT_BASE_URL: &str = "https://graph.microsoft.com/v1.0/";

/// Configuration for the Graph request client.
///
/// # Example
///
/// ```
/// use graphmail_rs::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(30))
///     .with_user_agent("my-app/1.0");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL relative request paths are rooted at. Always
    /// slash-terminated.
    pub base_url: Url,
    /// Request timeout.
    pub timeout: Duration,
    /// User-Agent header value.
    pub user_agent: String,
    /// Retry policy for transient failures.
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            timeout: Duration::from_secs(10),
            user_agent: format!("graphmail-rs/{} (Rust)", env!("CARGO_PKG_VERSION")),
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the base URL, ensuring it is slash-terminated so relative
    /// paths join underneath it.
    pub fn with_base_url(mut self, mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        self.base_url = base_url;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Explicit, testable retry policy for transient failures.
///
/// Applied below the authorization layer: eligible methods are re-sent on
/// the configured status codes (and on network-level failures) with
/// exponential backoff until the attempt budget runs out.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, the first send included.
    pub max_attempts: u32,
    /// Backoff factor; the sleep before attempt *n+1* is
    /// `factor * 2^(n-1)`, capped at `max_backoff`.
    pub backoff_factor: Duration,
    /// Ceiling for any single backoff sleep.
    pub max_backoff: Duration,
    /// HTTP status codes that trigger a retry.
    pub retry_statuses: Vec<u16>,
    /// Methods considered safe to re-send.
    pub retry_methods: Vec<Method>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_factor: Duration::from_millis(300),
            max_backoff: Duration::from_secs(30),
            retry_statuses: vec![429, 500, 502, 503, 504],
            retry_methods: vec![
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::PUT,
            ],
        }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Set the total attempt budget.
    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max.max(1);
        self
    }

    /// Set the backoff factor.
    pub fn with_backoff_factor(mut self, factor: Duration) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Set the backoff ceiling.
    pub fn with_max_backoff(mut self, max: Duration) -> Self {
        self.max_backoff = max;
        self
    }

    /// The sleep before re-sending after `completed_attempts` sends.
    pub fn backoff_for_attempt(&self, completed_attempts: u32) -> Duration {
        let exponent = completed_attempts.saturating_sub(1).min(16);
        let backoff = self.backoff_factor * 2u32.pow(exponent);
        backoff.min(self.max_backoff)
    }

    /// Whether a status code triggers a retry.
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }

    /// Whether a method is safe to re-send.
    pub fn is_retryable_method(&self, method: &Method) -> bool {
        self.retry_methods.contains(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn test_with_base_url_appends_slash() {
        let config = ClientConfig::default()
            .with_base_url(Url::parse("http://localhost:9999/v1.0").unwrap());
        assert!(config.base_url.as_str().ends_with('/'));
    }

    #[test]
    fn test_retry_backoff_doubles() {
        let retry = RetryConfig::default();
        assert_eq!(retry.backoff_for_attempt(1), Duration::from_millis(300));
        assert_eq!(retry.backoff_for_attempt(2), Duration::from_millis(600));
        assert_eq!(retry.backoff_for_attempt(3), Duration::from_millis(1200));
        assert_eq!(retry.backoff_for_attempt(4), Duration::from_millis(2400));
    }

    #[test]
    fn test_retry_backoff_capped() {
        let retry = RetryConfig::default()
            .with_backoff_factor(Duration::from_secs(20))
            .with_max_backoff(Duration::from_secs(30));
        assert_eq!(retry.backoff_for_attempt(4), Duration::from_secs(30));
    }

    #[test]
    fn test_should_retry_status() {
        let retry = RetryConfig::default();
        assert!(retry.should_retry_status(429));
        assert!(retry.should_retry_status(503));
        assert!(!retry.should_retry_status(404));
        assert!(!retry.should_retry_status(401));
    }

    #[test]
    fn test_retryable_methods() {
        let retry = RetryConfig::default();
        assert!(retry.is_retryable_method(&Method::GET));
        assert!(retry.is_retryable_method(&Method::PATCH));
        assert!(!retry.is_retryable_method(&Method::HEAD));
    }

    #[test]
    fn test_no_retry_keeps_single_attempt() {
        assert_eq!(RetryConfig::no_retry().max_attempts, 1);
        assert_eq!(RetryConfig::default().with_max_attempts(0).max_attempts, 1);
    }
}
