//! HTTP client implementation for the Graph mail API.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::api::{FoldersService, MessagesService, ScannerService};
use crate::auth::{AccessToken, AuthConfig, TokenProvider};
use crate::{Error, Result};

use super::config::ClientConfig;
use super::scan::Paginator;

/// The main client for interacting with the Graph mail API.
///
/// The client resolves bearer tokens through its [`TokenProvider`], retries
/// transient failures per its [`RetryConfig`](super::RetryConfig), retries
/// exactly once on 401 after forcing a token refresh, and exposes typed
/// services through method calls.
///
/// # Example
///
/// ```no_run
/// use graphmail_rs::{AuthConfig, GraphClient, Mailbox, ScanOptions};
///
/// # async fn example() -> graphmail_rs::Result<()> {
/// let client = GraphClient::from_config(AuthConfig::from_env()?)?;
///
/// // List visible folders
/// let folders = client.folders().list(&Mailbox::Me, false).await?;
///
/// // Scan the inbox, bounded to 25 messages
/// let outcome = client
///     .scanner()
///     .scan_inbox(&Mailbox::Me, &ScanOptions::default().with_max_records(25))
///     .await?;
/// println!("{} messages, more: {}", outcome.records.len(), outcome.has_more);
/// # Ok(())
/// # }
/// ```
pub struct GraphClient {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) auth: TokenProvider,
    pub(crate) config: ClientConfig,
}

/// Per-request options for [`GraphClient::request`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Query parameters appended to the URL.
    pub params: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Value>,
    /// Extra headers. `Authorization` and `Accept` are always set by the
    /// client and win over collisions here.
    pub headers: HeaderMap,
    /// Scope override for token resolution; defaults to the configured
    /// scopes.
    pub scopes: Option<Vec<String>>,
    /// Per-request timeout override.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    /// Options carrying only query parameters.
    pub fn with_params(params: Vec<(String, String)>) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }
}

impl GraphClient {
    /// Create a client over an existing token provider and configuration.
    pub fn new(auth: TokenProvider, config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            inner: Arc::new(ClientInner { http, auth, config }),
        })
    }

    /// Create a client from authentication settings alone, building the
    /// token provider and carrying the configured timeout over to the
    /// request layer.
    pub fn from_config(auth_config: AuthConfig) -> Result<Self> {
        let timeout = auth_config.timeout;
        let auth = TokenProvider::new(auth_config)?;
        Self::new(auth, ClientConfig::default().with_timeout(timeout))
    }

    /// Get the folders service.
    pub fn folders(&self) -> FoldersService {
        FoldersService::new(self.inner.clone())
    }

    /// Get the messages service.
    pub fn messages(&self) -> MessagesService {
        MessagesService::new(self.inner.clone())
    }

    /// Get the scanner service.
    pub fn scanner(&self) -> ScannerService {
        ScannerService::new(self.inner.clone())
    }

    /// Get the bounded paginator directly, for collections without a typed
    /// service.
    pub fn paginator(&self) -> Paginator {
        Paginator::new(self.inner.clone())
    }

    /// Get a reference to the token provider.
    pub fn auth(&self) -> &TokenProvider {
        &self.inner.auth
    }

    /// Perform one logical request against the API.
    ///
    /// Relative paths are rooted at the configured base URL; absolute URLs
    /// (pagination continuations) are used verbatim. A 2xx response yields
    /// the parsed JSON body, the raw text when the body is not JSON, or
    /// `None` when it is empty. Any other status, after transport retries
    /// and the single 401 refresh-retry, is a typed [`Error::Api`].
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Option<Value>> {
        self.inner.request(method, path, options).await
    }
}

impl Clone for GraphClient {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl std::fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient")
            .field("config", &self.inner.config)
            .finish()
    }
}

impl ClientInner {
    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Option<Value>> {
        let url = self.build_url(path)?;

        let token = self
            .auth
            .access_token(options.scopes.as_deref(), false)
            .await?;
        let mut response = self.send_with_retry(&method, &url, &options, &token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            // Token may be expired; retry once with a fresh one. A second
            // 401 falls through to the error path below.
            tracing::debug!(%url, "401 received, forcing token refresh");
            let token = self
                .auth
                .access_token(options.scopes.as_deref(), true)
                .await?;
            response = self.send_with_retry(&method, &url, &options, &token).await?;
        }

        Self::handle_response(response).await
    }

    /// Typed GET convenience.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_with_options(path, RequestOptions::default()).await
    }

    /// Typed GET with query parameters.
    pub(crate) async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<T> {
        self.get_with_options(path, RequestOptions::with_params(params))
            .await
    }

    async fn get_with_options<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T> {
        match self.request(Method::GET, path, options).await? {
            Some(value) => serde_json::from_value(value).map_err(Error::Json),
            None => Err(Error::InvalidInput(format!(
                "empty response body from {path}"
            ))),
        }
    }

    /// Root relative paths at the base URL; pass absolute continuation URLs
    /// through verbatim.
    fn build_url(&self, path: &str) -> Result<Url> {
        if path.starts_with("https://") || path.starts_with("http://") {
            return Url::parse(path).map_err(Error::UrlParse);
        }
        self.config
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(Error::UrlParse)
    }

    /// Merge caller headers under the client's own; `Authorization` and
    /// `Accept` always win.
    fn build_headers(&self, token: &AccessToken, extra: &HeaderMap) -> Result<HeaderMap> {
        let mut headers = extra.clone();

        let bearer = format!("Bearer {}", token.secret().expose_secret());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&bearer)
                .map_err(|_| Error::InvalidInput("token is not a valid header value".into()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Ok(headers)
    }

    /// Send the request, re-sending eligible methods on transient statuses
    /// and network failures with exponential backoff until the attempt
    /// budget is spent. The final response (or transport error) is returned
    /// untouched for the caller to interpret.
    async fn send_with_retry(
        &self,
        method: &Method,
        url: &Url,
        options: &RequestOptions,
        token: &AccessToken,
    ) -> Result<reqwest::Response> {
        let headers = self.build_headers(token, &options.headers)?;
        let retry = &self.config.retry;
        let mut attempt: u32 = 1;

        loop {
            let mut builder = self
                .http
                .request(method.clone(), url.clone())
                .headers(headers.clone());
            if !options.params.is_empty() {
                builder = builder.query(&options.params);
            }
            if let Some(body) = &options.body {
                builder = builder.json(body);
            }
            if let Some(timeout) = options.timeout {
                builder = builder.timeout(timeout);
            }

            let can_retry = attempt < retry.max_attempts && retry.is_retryable_method(method);

            match builder.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if can_retry && retry.should_retry_status(status) {
                        let delay = retry.backoff_for_attempt(attempt);
                        tracing::warn!(status, attempt, ?delay, "transient status, retrying");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Ok(response);
                }
                Err(err) => {
                    if can_retry {
                        let delay = retry.backoff_for_attempt(attempt);
                        tracing::warn!(error = %err, attempt, ?delay, "transport failure, retrying");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(Error::Http(err));
                }
            }
        }
    }

    async fn handle_response(response: reqwest::Response) -> Result<Option<Value>> {
        let status = response.status();

        if status.is_success() {
            let text = response.text().await.map_err(Error::Http)?;
            if text.is_empty() {
                return Ok(None);
            }
            return match serde_json::from_str::<Value>(&text) {
                Ok(value) => Ok(Some(value)),
                // Not a JSON body; hand the raw text back.
                Err(_) => Ok(Some(Value::String(text))),
            };
        }

        let reason = status.canonical_reason().unwrap_or("Unexpected response");
        let payload = response
            .text()
            .await
            .ok()
            .and_then(|text| serde_json::from_str::<Value>(&text).ok());
        Err(Error::api_from_envelope(status.as_u16(), reason, payload))
    }
}
