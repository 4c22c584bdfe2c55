//! Error types for the Graph mail client.
//!
//! This module provides a single error type covering all failure modes of
//! the crate, from configuration problems to token-cache I/O to API error
//! envelopes returned by the remote service.

use serde_json::{Map, Value};
use thiserror::Error;

/// A specialized `Result` type for Graph mail operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for all Graph mail operations.
///
/// Low-level components (token store, token provider, request client) raise
/// these typed failures directly. The pagination layer is the one place that
/// converts request failures into a degraded-but-valid partial result instead
/// of an error.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing configuration; fatal at startup, never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The token cache file exists but does not hold valid serialized state.
    #[error("Token cache is corrupt: {0}")]
    CacheCorrupt(String),

    /// The token cache could not be written or removed.
    #[error("Failed to persist token cache: {0}")]
    CachePersist(String),

    /// The identity platform could not issue a usable token.
    #[error("Authentication failed{}", format_auth_detail(.code, .description))]
    Authentication {
        /// Provider-supplied error code (e.g. `invalid_client`), when present.
        code: Option<String>,
        /// Provider-supplied human-readable description, when present.
        description: Option<String>,
    },

    /// The API returned a non-success status after transport retries.
    #[error("Graph API request failed ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error code from the structured error envelope, when present.
        code: Option<String>,
        /// Human-readable message (envelope message or HTTP reason phrase).
        message: String,
        /// Remaining fields of the error envelope.
        details: Map<String, Value>,
    },

    /// Network-level failure after the transport retry budget was exhausted.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL construction failed.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Invalid input provided to a function.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

fn format_auth_detail(code: &Option<String>, description: &Option<String>) -> String {
    match (code, description) {
        (Some(code), Some(description)) => format!(": {code} - {description}"),
        (Some(code), None) => format!(": {code}"),
        (None, Some(description)) => format!(": {description}"),
        (None, None) => String::new(),
    }
}

impl Error {
    /// Returns `true` if this error is potentially transient and the
    /// operation could be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) => true,
            Error::Api { status, .. } => {
                matches!(status, 429 | 500 | 502 | 503 | 504)
            }
            _ => false,
        }
    }

    /// Returns `true` if this is an authentication-related error.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Error::Authentication { .. } | Error::Api { status: 401, .. }
        )
    }

    /// Returns the HTTP status code for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Build an [`Error::Api`] from a response status, its reason phrase,
    /// and an optional JSON body.
    ///
    /// The `{error: {code, message, ...}}` envelope is consulted when
    /// present; any extra envelope fields are carried in `details`.
    pub(crate) fn api_from_envelope(status: u16, reason: &str, payload: Option<Value>) -> Self {
        let mut code = None;
        let mut message = reason.to_string();
        let mut details = Map::new();

        if let Some(Value::Object(body)) = payload {
            if let Some(Value::Object(envelope)) = body.get("error") {
                if let Some(value) = envelope.get("code").and_then(Value::as_str) {
                    code = Some(value.to_string());
                }
                if let Some(value) = envelope.get("message").and_then(Value::as_str) {
                    message = value.to_string();
                }
                details = envelope
                    .iter()
                    .filter(|(key, _)| key.as_str() != "code" && key.as_str() != "message")
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
            }
        }

        Error::Api {
            status,
            code,
            message,
            details,
        }
    }
}
