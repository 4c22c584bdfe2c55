//! Authentication: configuration, token caching, and token acquisition.
//!
//! Three layers, leaves first:
//!
//! 1. [`TokenCacheStore`] — durable persistence of credential state behind
//!    a mutex, with a dirty flag that keeps unchanged state from being
//!    rewritten.
//! 2. [`TokenProvider`] — silent-first token acquisition with a single
//!    forced fallback exchange (client-credential for app-only access,
//!    device-code for user delegation), persisting through the store after
//!    every success.
//! 3. [`AuthConfig`] — the immutable settings record both are built from.
//!
//! # Example
//!
//! ```no_run
//! use graphmail_rs::{AuthConfig, TokenProvider};
//!
//! # async fn example() -> graphmail_rs::Result<()> {
//! let config = AuthConfig::from_env()?;
//! let provider = TokenProvider::new(config)?;
//! let token = provider.access_token(None, false).await?;
//! println!("token covers scopes {:?}", token.scopes());
//! # Ok(())
//! # }
//! ```

mod cache;
mod config;
mod provider;

#[cfg(test)]
pub(crate) use provider::test_support;

pub use cache::{CachedToken, TokenCacheStore};
pub use config::{normalize_scopes, AuthConfig, DEFAULT_CACHE_PATH, DEFAULT_SCOPE};
pub use provider::{AccessToken, TokenProvider};
