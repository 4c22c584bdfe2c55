//! Authentication configuration.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::{Error, Result};

/// Default scope requested when none is configured.
pub const DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Default token cache location, relative to the working directory.
pub const DEFAULT_CACHE_PATH: &str = "data/cache/token_cache.json";

const DEFAULT_AUTHORITY_TEMPLATE: &str = "https://login.microsoftonline.com/{tenant_id}";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Immutable configuration for the authentication layer.
///
/// Constructed once at startup; derived copies (e.g. [`with_scopes`]) never
/// mutate the original.
///
/// [`with_scopes`]: AuthConfig::with_scopes
///
/// # Example
///
/// ```
/// use graphmail_rs::AuthConfig;
///
/// let config = AuthConfig::new("my-tenant", "my-client-id")
///     .with_client_secret("s3cret")
///     .with_scopes(&["Mail.Read", "Mail.Read"])
///     .unwrap();
/// assert_eq!(config.scopes, vec!["Mail.Read"]);
/// ```
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Directory (tenant) ID.
    pub tenant_id: String,
    /// Application (client) ID.
    pub client_id: String,
    /// Client secret for app-only access. When absent, user-delegated
    /// device-code flow is used instead.
    pub client_secret: Option<SecretString>,
    /// Authority URL the token endpoints hang off.
    pub authority: String,
    /// Normalized scope list: non-empty, deduplicated, first-occurrence
    /// order preserved.
    pub scopes: Vec<String>,
    /// Token cache file location; `None` disables on-disk caching.
    pub cache_path: Option<PathBuf>,
    /// HTTP timeout for identity and API requests.
    pub timeout: Duration,
}

impl AuthConfig {
    /// Create a configuration with documented defaults for everything but
    /// the tenant and client IDs.
    pub fn new(tenant_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        let tenant_id = tenant_id.into();
        let authority = DEFAULT_AUTHORITY_TEMPLATE.replace("{tenant_id}", &tenant_id);
        Self {
            tenant_id,
            client_id: client_id.into(),
            client_secret: None,
            authority,
            scopes: vec![DEFAULT_SCOPE.to_string()],
            cache_path: Some(PathBuf::from(DEFAULT_CACHE_PATH)),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a configuration from environment variables.
    ///
    /// Recognized variables: `AZURE_TENANT_ID` (required), `AZURE_CLIENT_ID`
    /// (required), `AZURE_CLIENT_SECRET`, `AZURE_AUTHORITY`, `AZURE_SCOPE`
    /// (comma/space separated), `AZURE_CACHE_PATH`, `AZURE_HTTP_TIMEOUT`
    /// (seconds).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create a configuration from an arbitrary variable lookup.
    ///
    /// This is what [`from_env`](Self::from_env) delegates to and is the
    /// seam used by tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let tenant_id = required(&lookup, "AZURE_TENANT_ID")?;
        let client_id = required(&lookup, "AZURE_CLIENT_ID")?;

        let client_secret = lookup("AZURE_CLIENT_SECRET")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(SecretString::from);

        let authority = match lookup("AZURE_AUTHORITY").filter(|value| !value.trim().is_empty()) {
            Some(authority) => authority,
            None => DEFAULT_AUTHORITY_TEMPLATE.replace("{tenant_id}", &tenant_id),
        };

        let scopes_raw = lookup("AZURE_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.to_string());
        let scopes = normalize_scopes(&scopes_raw);
        if scopes.is_empty() {
            return Err(Error::Config("AZURE_SCOPE cannot be empty".into()));
        }

        let cache_path = match lookup("AZURE_CACHE_PATH") {
            Some(value) if !value.trim().is_empty() => Some(PathBuf::from(value)),
            _ => Some(PathBuf::from(DEFAULT_CACHE_PATH)),
        };

        let timeout = match lookup("AZURE_HTTP_TIMEOUT") {
            Some(value) => {
                let seconds: f64 = value.trim().parse().map_err(|_| {
                    Error::Config(format!("AZURE_HTTP_TIMEOUT is not a number: {value}"))
                })?;
                Duration::from_secs_f64(seconds)
            }
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            tenant_id,
            client_id,
            client_secret,
            authority,
            scopes,
            cache_path,
            timeout,
        })
    }

    /// Set the client secret, switching token acquisition to the app-only
    /// client-credential grant.
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(SecretString::from(secret.into()));
        self
    }

    /// Override the authority URL.
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    /// Return a copy with an updated scope list.
    ///
    /// Scopes are trimmed and deduplicated; an effectively empty list is a
    /// configuration error.
    pub fn with_scopes(mut self, scopes: &[&str]) -> Result<Self> {
        let normalized = dedup_scopes(scopes.iter().map(|scope| scope.trim().to_string()));
        if normalized.is_empty() {
            return Err(Error::Config("Scopes cannot be empty".into()));
        }
        self.scopes = normalized;
        Ok(self)
    }

    /// Set or disable the token cache file location.
    pub fn with_cache_path(mut self, path: Option<PathBuf>) -> Self {
        self.cache_path = path;
        self
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The OAuth2 token endpoint for this authority.
    pub(crate) fn token_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority.trim_end_matches('/'))
    }

    /// The OAuth2 device-authorization endpoint for this authority.
    pub(crate) fn device_code_endpoint(&self) -> String {
        format!(
            "{}/oauth2/v2.0/devicecode",
            self.authority.trim_end_matches('/')
        )
    }

    /// The OAuth2 authorization endpoint for this authority.
    pub(crate) fn authorize_endpoint(&self) -> String {
        format!(
            "{}/oauth2/v2.0/authorize",
            self.authority.trim_end_matches('/')
        )
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    let value = lookup(key)
        .ok_or_else(|| Error::Config(format!("Missing required environment variable: {key}")))?;
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(Error::Config(format!(
            "Environment variable {key} cannot be blank"
        )));
    }
    Ok(value)
}

/// Split a comma/space separated scope string into a normalized list:
/// trimmed, empties dropped, duplicates removed with first-occurrence order
/// preserved.
pub fn normalize_scopes(raw: &str) -> Vec<String> {
    dedup_scopes(
        raw.split(|c: char| c == ',' || c.is_whitespace())
            .map(|scope| scope.trim().to_string()),
    )
}

fn dedup_scopes(scopes: impl Iterator<Item = String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for scope in scopes {
        if !scope.is_empty() && !unique.contains(&scope) {
            unique.push(scope);
        }
    }
    unique
}
