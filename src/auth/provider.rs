//! Token acquisition against the Microsoft identity platform.

use std::fmt;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use super::cache::{CachedToken, TokenCacheStore};
use super::config::AuthConfig;
use crate::{Error, Result};

/// Leeway subtracted from a cached entry's expiry before the silent path
/// trusts it.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Fallback polling interval for the device-code flow.
const DEVICE_CODE_POLL_SECS: u64 = 5;

/// A bearer token together with the scope set it was issued for.
///
/// The token string is held as a secret and redacted from `Debug` output;
/// expiry is enforced by the identity platform and re-validated
/// opportunistically when the API answers 401.
#[derive(Clone)]
pub struct AccessToken {
    secret: SecretString,
    scopes: Vec<String>,
}

impl AccessToken {
    fn new(token: String, scopes: Vec<String>) -> Self {
        Self {
            secret: SecretString::from(token),
            scopes,
        }
    }

    /// The bearer secret. Callers must expose it explicitly.
    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    /// The scopes the token was requested for.
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Produces valid access tokens for requested scope sets, using the
/// cheapest valid path.
///
/// Acquisition order: silent lookup in the cache store, then a full
/// exchange — the client-credential grant when a client secret is
/// configured (app-only), otherwise the interactive device-code flow (user
/// delegation). Every successful exchange is written through the store,
/// which filters no-op writes.
///
/// # Thread safety
///
/// The provider holds no mutable state of its own; all shared state lives
/// in the [`TokenCacheStore`], whose operations are serialized by its
/// internal mutex. Two tasks racing to refresh may both perform an
/// exchange, but their writes cannot interleave.
#[derive(Debug)]
pub struct TokenProvider {
    config: AuthConfig,
    store: Arc<TokenCacheStore>,
    http: reqwest::Client,
}

impl TokenProvider {
    /// Create a provider, building a cache store from the configured path.
    pub fn new(config: AuthConfig) -> Result<Self> {
        let store = Arc::new(TokenCacheStore::new(config.cache_path.clone())?);
        Self::with_store(config, store)
    }

    /// Create a provider over an existing cache store.
    pub fn with_store(config: AuthConfig, store: Arc<TokenCacheStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::Http)?;
        Ok(Self {
            config,
            store,
            http,
        })
    }

    /// The configuration this provider was built from.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// The cache store backing this provider.
    pub fn store(&self) -> &Arc<TokenCacheStore> {
        &self.store
    }

    /// Acquire an access token for `scopes` (default configured scopes when
    /// `None`), using the cache when possible.
    ///
    /// `force_refresh` skips the silent path and goes straight to a full
    /// exchange; the request client sets it after a 401.
    pub async fn access_token(
        &self,
        scopes: Option<&[String]>,
        force_refresh: bool,
    ) -> Result<AccessToken> {
        let scopes: Vec<String> = scopes.unwrap_or(&self.config.scopes).to_vec();
        let key = scope_key(&scopes);

        if !force_refresh {
            if let Some(entry) = self.store.lookup(&key) {
                let usable_until = entry.expires_at - ChronoDuration::seconds(EXPIRY_SKEW_SECS);
                if Utc::now() < usable_until {
                    tracing::debug!(scope_key = %key, "silent token acquisition hit");
                    // Persist is still attempted; the store filters no-ops.
                    self.store.persist()?;
                    return Ok(AccessToken::new(entry.access_token, scopes));
                }
                tracing::debug!(scope_key = %key, "cached token expired, acquiring fresh");
            }
        }

        let reply = if self.config.client_secret.is_some() {
            self.client_credential_grant(&scopes).await?
        } else {
            self.device_code_grant(&scopes).await?
        };

        self.finish_exchange(&key, &scopes, reply)
    }

    /// Acquire a token on behalf of a user assertion (the OAuth2
    /// `jwt-bearer` grant).
    pub async fn acquire_on_behalf_of(
        &self,
        user_assertion: &str,
        scopes: &[String],
    ) -> Result<AccessToken> {
        let scopes = scopes.to_vec();
        let secret = self.require_client_secret()?;
        let form = [
            (
                "grant_type",
                "urn:ietf:params:oauth:grant-type:jwt-bearer".to_string(),
            ),
            ("client_id", self.config.client_id.clone()),
            ("client_secret", secret),
            ("assertion", user_assertion.to_string()),
            ("scope", scopes.join(" ")),
            ("requested_token_use", "on_behalf_of".to_string()),
        ];
        let reply = self.post_token_form(&form).await?;
        self.finish_exchange(&scope_key(&scopes), &scopes, reply)
    }

    /// Build the authorization URL for the auth-code flow.
    pub fn authorization_url(
        &self,
        scopes: Option<&[String]>,
        redirect_uri: &str,
        state: Option<&str>,
    ) -> Result<Url> {
        let scopes = scopes.unwrap_or(&self.config.scopes);
        let mut url = Url::parse(&self.config.authorize_endpoint())?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.config.client_id)
                .append_pair("response_type", "code")
                .append_pair("redirect_uri", redirect_uri)
                .append_pair("scope", &scopes.join(" "));
            if let Some(state) = state {
                query.append_pair("state", state);
            }
        }
        Ok(url)
    }

    /// Exchange an authorization code for tokens.
    pub async fn acquire_token_by_authorization_code(
        &self,
        code: &str,
        scopes: Option<&[String]>,
        redirect_uri: &str,
    ) -> Result<AccessToken> {
        let scopes: Vec<String> = scopes.unwrap_or(&self.config.scopes).to_vec();
        let mut form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("client_id", self.config.client_id.clone()),
            ("code", code.to_string()),
            ("redirect_uri", redirect_uri.to_string()),
            ("scope", scopes.join(" ")),
        ];
        if let Some(secret) = &self.config.client_secret {
            form.push(("client_secret", secret.expose_secret().to_string()));
        }
        let reply = self.post_token_form(&form).await?;
        self.finish_exchange(&scope_key(&scopes), &scopes, reply)
    }

    /// Empty the cache store and delete its backing file.
    pub fn clear_cache(&self) -> Result<()> {
        self.store.clear()
    }

    async fn client_credential_grant(&self, scopes: &[String]) -> Result<TokenReply> {
        let secret = self.require_client_secret()?;
        tracing::debug!("acquiring token via client-credential grant");
        let form = [
            ("grant_type", "client_credentials".to_string()),
            ("client_id", self.config.client_id.clone()),
            ("client_secret", secret),
            ("scope", scopes.join(" ")),
        ];
        self.post_token_form(&form).await
    }

    async fn device_code_grant(&self, scopes: &[String]) -> Result<TokenReply> {
        let form = [
            ("client_id", self.config.client_id.clone()),
            ("scope", scopes.join(" ")),
        ];
        let response = self
            .http
            .post(self.config.device_code_endpoint())
            .form(&form)
            .send()
            .await
            .map_err(Error::Http)?;
        let device: DeviceCodeReply = response.json().await.map_err(Error::Http)?;

        // Surface the verification prompt; there is no terminal to own here.
        tracing::info!(
            user_code = %device.user_code,
            verification_uri = %device.verification_uri,
            "{}",
            device.message.as_deref().unwrap_or(
                "To sign in, open the verification URI and enter the user code"
            )
        );

        let deadline = Utc::now() + ChronoDuration::seconds(device.expires_in);
        let mut interval = device.interval.unwrap_or(DEVICE_CODE_POLL_SECS);

        loop {
            if Utc::now() >= deadline {
                return Err(Error::Authentication {
                    code: Some("expired_token".to_string()),
                    description: Some("device code expired before sign-in completed".to_string()),
                });
            }
            tokio::time::sleep(std::time::Duration::from_secs(interval)).await;

            let form = [
                (
                    "grant_type",
                    "urn:ietf:params:oauth:grant-type:device_code".to_string(),
                ),
                ("client_id", self.config.client_id.clone()),
                ("device_code", device.device_code.clone()),
            ];
            let reply = self.post_token_form(&form).await?;
            match reply.error.as_deref() {
                Some("authorization_pending") => continue,
                Some("slow_down") => interval += 5,
                _ => return Ok(reply),
            }
        }
    }

    async fn post_token_form(&self, form: &[(&str, String)]) -> Result<TokenReply> {
        let response = self
            .http
            .post(self.config.token_endpoint())
            .form(form)
            .send()
            .await
            .map_err(Error::Http)?;
        // Identity endpoints answer errors with 400 + a JSON body; parse
        // the body regardless of status and let the caller inspect it.
        response.json().await.map_err(Error::Http)
    }

    fn finish_exchange(
        &self,
        key: &str,
        scopes: &[String],
        reply: TokenReply,
    ) -> Result<AccessToken> {
        let Some(access_token) = reply.access_token else {
            tracing::debug!(code = ?reply.error, "token exchange yielded no access token");
            return Err(Error::Authentication {
                code: reply.error,
                description: reply.error_description,
            });
        };

        let expires_in = reply.expires_in.unwrap_or(0);
        self.store.store_token(
            key,
            CachedToken {
                access_token: access_token.clone(),
                expires_at: Utc::now() + ChronoDuration::seconds(expires_in),
                account: reply.account,
                scopes: scopes.to_vec(),
            },
        );
        self.store.persist()?;
        tracing::debug!(scope_key = %key, expires_in, "token exchange succeeded");
        Ok(AccessToken::new(access_token, scopes.to_vec()))
    }

    fn require_client_secret(&self) -> Result<String> {
        self.config
            .client_secret
            .as_ref()
            .map(|secret| secret.expose_secret().to_string())
            .ok_or_else(|| Error::Config("client secret is required for this grant".into()))
    }
}

/// Normalized cache key for a scope set: order-insensitive.
fn scope_key(scopes: &[String]) -> String {
    let mut sorted: Vec<&str> = scopes.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.join(" ")
}

/// Permissive decoding of a token-endpoint reply; success and error
/// responses share one shape.
#[derive(Debug, Deserialize)]
struct TokenReply {
    access_token: Option<String>,
    expires_in: Option<i64>,
    #[serde(default)]
    account: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeviceCodeReply {
    device_code: String,
    user_code: String,
    verification_uri: String,
    expires_in: i64,
    interval: Option<u64>,
    message: Option<String>,
}
