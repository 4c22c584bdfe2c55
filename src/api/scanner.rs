//! Bounded scans over mailbox folders.

use std::sync::Arc;

use crate::client::{ClientInner, Paginator, ScanOutcome};
use crate::models::{Folder, FolderId, Mailbox, Message};
use crate::Result;

use super::folders::FoldersService;

/// Default maximum number of messages collected per scan.
pub const DEFAULT_MAX_RECORDS: usize = 100;

/// Default number of messages requested per page.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Fields selected during scanning; minimal for throughput, the body is
/// opted into via [`ScanOptions::with_body`].
pub const DEFAULT_SCAN_FIELDS: &[&str] = &[
    "id",
    "subject",
    "from",
    "sender",
    "toRecipients",
    "receivedDateTime",
    "sentDateTime",
    "hasAttachments",
    "importance",
    "isRead",
    "bodyPreview",
    "categories",
    "parentFolderId",
    "conversationId",
];

/// Options controlling a scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Maximum number of successfully parsed messages to collect.
    pub max_records: usize,
    /// Page size requested from the server, capped by what remains of
    /// `max_records`.
    pub batch_size: usize,
    /// Whether to select the full body for each message.
    pub include_body: bool,
    /// OData ordering clause; newest first by default.
    pub order_by: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
            batch_size: DEFAULT_BATCH_SIZE,
            include_body: false,
            order_by: "receivedDateTime desc".to_string(),
        }
    }
}

impl ScanOptions {
    /// Set the record bound.
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    /// Set the page size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Include the full message body in scanned records.
    pub fn with_body(mut self, include_body: bool) -> Self {
        self.include_body = include_body;
        self
    }

    /// Override the ordering clause.
    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = order_by.into();
        self
    }

    fn select_clause(&self) -> String {
        let mut fields: Vec<&str> = DEFAULT_SCAN_FIELDS.to_vec();
        if self.include_body {
            fields.push("body");
        }
        fields.join(",")
    }
}

/// Service for scanning folders, built on the bounded [`Paginator`].
///
/// Scans are best-effort: a malformed message is recorded and skipped, a
/// failed page ends the scan with whatever was already collected, and
/// `has_more` reports whether the record bound truncated the result.
///
/// # Example
///
/// ```no_run
/// use graphmail_rs::{Mailbox, ScanOptions};
///
/// # async fn example(client: graphmail_rs::GraphClient) -> graphmail_rs::Result<()> {
/// let outcome = client
///     .scanner()
///     .scan_unread(&Mailbox::Me, None, &ScanOptions::default())
///     .await?;
/// for message in &outcome.records {
///     println!("{:?}", message.subject);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ScannerService {
    inner: Arc<ClientInner>,
}

impl ScannerService {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Scan the inbox folder.
    ///
    /// Folder-list failures propagate; an account with no recognizable
    /// inbox yields an empty outcome with the problem recorded.
    pub async fn scan_inbox(
        &self,
        mailbox: &Mailbox,
        options: &ScanOptions,
    ) -> Result<ScanOutcome<Message>> {
        let folders = FoldersService::new(self.inner.clone());
        let Some(inbox) = folders.inbox(mailbox).await? else {
            let mut outcome = ScanOutcome::default();
            outcome.folder_name = Some("Inbox".to_string());
            outcome.errors.push("Inbox folder not found".to_string());
            return Ok(outcome);
        };

        Ok(self
            .scan_resolved(mailbox, &inbox, None, options)
            .await)
    }

    /// Scan a specific folder.
    pub async fn scan_folder(
        &self,
        mailbox: &Mailbox,
        folder_id: &FolderId,
        options: &ScanOptions,
    ) -> ScanOutcome<Message> {
        let mut outcome = self
            .run(mailbox, folder_id.as_str(), None, options)
            .await;
        outcome.folder_id = Some(folder_id.to_string());
        outcome
    }

    /// Scan with an OData filter expression (e.g. `"isRead eq false"`).
    ///
    /// Defaults to the inbox when no folder is given.
    pub async fn scan_with_filter(
        &self,
        mailbox: &Mailbox,
        filter: &str,
        folder_id: Option<&FolderId>,
        options: &ScanOptions,
    ) -> Result<ScanOutcome<Message>> {
        let folders = FoldersService::new(self.inner.clone());

        let folder = match folder_id {
            Some(folder_id) => folders.get(mailbox, folder_id).await.ok(),
            None => folders.inbox(mailbox).await?,
        };

        match (folder, folder_id) {
            (Some(folder), _) => Ok(self
                .scan_resolved(mailbox, &folder, Some(filter), options)
                .await),
            // A named folder that failed to resolve still gets scanned by
            // its ID; only the display name is lost.
            (None, Some(folder_id)) => {
                let mut outcome = self.run(mailbox, folder_id.as_str(), Some(filter), options).await;
                outcome.folder_id = Some(folder_id.to_string());
                Ok(outcome)
            }
            (None, None) => {
                let mut outcome = ScanOutcome::default();
                outcome.errors.push("Inbox folder not found".to_string());
                Ok(outcome)
            }
        }
    }

    /// Scan only unread messages.
    pub async fn scan_unread(
        &self,
        mailbox: &Mailbox,
        folder_id: Option<&FolderId>,
        options: &ScanOptions,
    ) -> Result<ScanOutcome<Message>> {
        self.scan_with_filter(mailbox, "isRead eq false", folder_id, options)
            .await
    }

    async fn scan_resolved(
        &self,
        mailbox: &Mailbox,
        folder: &Folder,
        filter: Option<&str>,
        options: &ScanOptions,
    ) -> ScanOutcome<Message> {
        let mut outcome = self.run(mailbox, &folder.id, filter, options).await;
        outcome.folder_id = Some(folder.id.clone());
        outcome.folder_name = Some(folder.display_name.clone());
        outcome
    }

    async fn run(
        &self,
        mailbox: &Mailbox,
        folder_id: &str,
        filter: Option<&str>,
        options: &ScanOptions,
    ) -> ScanOutcome<Message> {
        let path = format!("{}/mailFolders/{}/messages", mailbox.segment(), folder_id);

        let mut params = vec![
            ("$select".to_string(), options.select_clause()),
            ("$orderby".to_string(), options.order_by.clone()),
        ];
        if let Some(filter) = filter {
            params.push(("$filter".to_string(), filter.to_string()));
        }

        Paginator::new(self.inner.clone())
            .collect(&path, params, options.batch_size, options.max_records)
            .await
    }
}
