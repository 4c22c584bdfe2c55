//! # graphmail-rs
//!
//! An async Rust client for the Microsoft Graph mail API.
//!
//! This crate provides the authenticated request pipeline for a cloud
//! mailbox: OAuth2 token acquisition with on-disk caching and refresh, a
//! resilient HTTP layer, and cursor-based pagination that turns a paged
//! remote collection into a bounded, fault-tolerant local sequence.
//!
//! ## Features
//!
//! - **Authentication**: silent-first token acquisition backed by a
//!   file-persisted cache, with client-credential (app-only) and
//!   device-code (user-delegated) flows
//! - **Resilient requests**: explicit retry policy for transient failures,
//!   plus exactly one forced-refresh retry on 401
//! - **Pagination**: lazy streams for full traversal and bounded scans
//!   that prefer partial results over total failure
//! - **Typed models**: schema-validated decoding of messages, folders,
//!   and attachments
//! - **Async-first**: built on Tokio and reqwest
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use graphmail_rs::{AuthConfig, GraphClient, Mailbox, ScanOptions};
//!
//! #[tokio::main]
//! async fn main() -> graphmail_rs::Result<()> {
//!     // Configuration from AZURE_* environment variables
//!     let client = GraphClient::from_config(AuthConfig::from_env()?)?;
//!
//!     // List visible mail folders
//!     let folders = client.folders().list(&Mailbox::Me, false).await?;
//!     println!("{} folders", folders.len());
//!
//!     // Scan the inbox, bounded to 25 messages
//!     let outcome = client
//!         .scanner()
//!         .scan_inbox(&Mailbox::Me, &ScanOptions::default().with_max_records(25))
//!         .await?;
//!
//!     for message in &outcome.records {
//!         println!("{:?} from {:?}", message.subject, message.from);
//!     }
//!     if outcome.has_more {
//!         println!("more messages remain beyond the bound");
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Scanning with a filter
//!
//! ```rust,no_run
//! use graphmail_rs::{AuthConfig, GraphClient, Mailbox, ScanOptions};
//!
//! # async fn example() -> graphmail_rs::Result<()> {
//! let client = GraphClient::from_config(AuthConfig::from_env()?)?;
//!
//! let outcome = client
//!     .scanner()
//!     .scan_with_filter(
//!         &Mailbox::Me,
//!         "hasAttachments eq true",
//!         None,
//!         &ScanOptions::default(),
//!     )
//!     .await?;
//!
//! println!(
//!     "{} matched, {} skipped, success rate {:.0}%",
//!     outcome.records.len(),
//!     outcome.skipped_count,
//!     outcome.success_rate()
//! );
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod models;

// Re-export primary types at crate root for convenience
pub use api::{FolderCache, FoldersService, MessagesService, ScanOptions, ScannerService};
pub use auth::{AccessToken, AuthConfig, CachedToken, TokenCacheStore, TokenProvider};
pub use client::{
    ClientConfig, GraphClient, PageStream, Paginator, RequestOptions, RetryConfig, ScanOutcome,
};
pub use error::{Error, Result};
pub use models::{FolderId, Importance, Mailbox, MessageId};

/// Prelude module for convenient imports.
///
/// ```rust
/// use graphmail_rs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::api::{FolderCache, ScanOptions};
    pub use crate::auth::{AccessToken, AuthConfig, TokenProvider};
    pub use crate::client::{ClientConfig, GraphClient, RequestOptions, RetryConfig, ScanOutcome};
    pub use crate::error::{Error, Result};
    pub use crate::models::{
        Attachment, EmailAddress, Folder, FolderId, Importance, Mailbox, Message, MessageBody,
        MessageId, Recipient,
    };
}
