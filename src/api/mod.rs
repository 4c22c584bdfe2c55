//! Typed services over the mailbox API surface.
//!
//! Each service provides methods for one subset of the mail API and is
//! obtained from the client ([`folders`](crate::GraphClient::folders),
//! [`messages`](crate::GraphClient::messages),
//! [`scanner`](crate::GraphClient::scanner)).

mod folders;
mod messages;
mod scanner;

pub use folders::{FolderCache, FoldersService};
pub use messages::{MessagesService, DEFAULT_SELECT_FIELDS};
pub use scanner::{
    ScanOptions, ScannerService, DEFAULT_BATCH_SIZE, DEFAULT_MAX_RECORDS, DEFAULT_SCAN_FIELDS,
};
