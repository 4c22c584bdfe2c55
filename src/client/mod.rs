//! HTTP client and pagination layer for the Graph mail API.
//!
//! This module provides the main entry point [`GraphClient`] plus the
//! pagination engines built on it: the lazy [`PageStream`] for unbounded
//! cursor traversal and the bounded, fault-tolerant [`Paginator`].
//!
//! # Example
//!
//! ```no_run
//! use graphmail_rs::{AuthConfig, GraphClient, Mailbox};
//!
//! # async fn example() -> graphmail_rs::Result<()> {
//! let client = GraphClient::from_config(AuthConfig::from_env()?)?;
//! let folders = client.folders().list(&Mailbox::Me, false).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod http;
pub mod paginated;
mod scan;

pub use config::{ClientConfig, RetryConfig, DEFAULT_BASE_URL};
pub use http::{GraphClient, RequestOptions};
pub use paginated::{PageStream, DEFAULT_PAGE_SIZE};
pub use scan::{Paginator, ScanOutcome};

pub(crate) use http::ClientInner;
pub(crate) use paginated::PageStreamBuilder;
