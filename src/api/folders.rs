//! Mail folder operations.

use std::sync::Arc;

use futures_util::StreamExt;

use crate::client::{ClientInner, PageStreamBuilder};
use crate::models::{Folder, FolderId, Mailbox};
use crate::{Error, Result};

/// Page size for folder listing.
const FOLDER_PAGE_SIZE: usize = 100;

/// Service for mail folder operations.
///
/// # Example
///
/// ```no_run
/// use graphmail_rs::Mailbox;
///
/// # async fn example(client: graphmail_rs::GraphClient) -> graphmail_rs::Result<()> {
/// if let Some(inbox) = client.folders().inbox(&Mailbox::Me).await? {
///     println!("{} unread", inbox.unread_item_count);
/// }
/// # Ok(())
/// # }
/// ```
pub struct FoldersService {
    inner: Arc<ClientInner>,
}

impl FoldersService {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// List all mail folders, traversing every page.
    ///
    /// Malformed folder records are skipped; transport and API failures
    /// propagate.
    pub async fn list(&self, mailbox: &Mailbox, include_hidden: bool) -> Result<Vec<Folder>> {
        let path = format!("{}/mailFolders", mailbox.segment());
        let mut stream = PageStreamBuilder::<Folder>::new(self.inner.clone(), path)
            .per_page(FOLDER_PAGE_SIZE)
            .build();

        let mut folders = Vec::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(folder) => folders.push(folder),
                Err(Error::Json(err)) => {
                    tracing::debug!(error = %err, "skipping malformed folder record");
                }
                Err(err) => return Err(err),
            }
        }

        if !include_hidden {
            folders.retain(|folder| !folder.is_hidden);
        }
        Ok(folders)
    }

    /// Repopulate a caller-owned [`FolderCache`] from the remote list.
    pub async fn refresh(&self, mailbox: &Mailbox, cache: &mut FolderCache) -> Result<()> {
        let folders = self.list(mailbox, true).await?;
        cache.replace(folders);
        Ok(())
    }

    /// Get a folder by its ID.
    pub async fn get(&self, mailbox: &Mailbox, folder_id: &FolderId) -> Result<Folder> {
        self.inner
            .get(&format!("{}/mailFolders/{}", mailbox.segment(), folder_id))
            .await
    }

    /// Find a folder by display name.
    pub async fn by_name(
        &self,
        mailbox: &Mailbox,
        name: &str,
        case_sensitive: bool,
    ) -> Result<Option<Folder>> {
        let folders = self.list(mailbox, true).await?;
        Ok(find_by_name(&folders, name, case_sensitive))
    }

    /// Find the inbox folder.
    ///
    /// Tries the common display names first, then falls back to the first
    /// visible folder with "inbox" in its name.
    pub async fn inbox(&self, mailbox: &Mailbox) -> Result<Option<Folder>> {
        let folders = self.list(mailbox, true).await?;
        for name in ["Inbox", "INBOX"] {
            if let Some(folder) = find_by_name(&folders, name, false) {
                return Ok(Some(folder));
            }
        }
        Ok(folders
            .iter()
            .find(|folder| !folder.is_hidden && folder.display_name.to_lowercase().contains("inbox"))
            .cloned())
    }

    /// Find the sent items folder.
    pub async fn sent_items(&self, mailbox: &Mailbox) -> Result<Option<Folder>> {
        self.by_known_names(mailbox, &["Sent Items", "Sent", "SENT"])
            .await
    }

    /// Find the deleted items folder.
    pub async fn deleted_items(&self, mailbox: &Mailbox) -> Result<Option<Folder>> {
        self.by_known_names(mailbox, &["Deleted Items", "Trash", "Deleted"])
            .await
    }

    /// Case-insensitive substring search over folder display names.
    pub async fn search(&self, mailbox: &Mailbox, query: &str) -> Result<Vec<Folder>> {
        let folders = self.list(mailbox, true).await?;
        let query = query.to_lowercase();
        Ok(folders
            .into_iter()
            .filter(|folder| folder.display_name.to_lowercase().contains(&query))
            .collect())
    }

    async fn by_known_names(&self, mailbox: &Mailbox, names: &[&str]) -> Result<Option<Folder>> {
        let folders = self.list(mailbox, true).await?;
        for name in names {
            if let Some(folder) = find_by_name(&folders, name, false) {
                return Ok(Some(folder));
            }
        }
        Ok(None)
    }
}

fn find_by_name(folders: &[Folder], name: &str, case_sensitive: bool) -> Option<Folder> {
    find_by_name_ref(folders, name, case_sensitive).cloned()
}

/// An explicit, caller-owned folder cache.
///
/// Nothing in the crate holds one of these behind the caller's back: the
/// owner decides when to [`FoldersService::refresh`] it and when to
/// [`clear`](FolderCache::clear) it.
#[derive(Debug, Clone, Default)]
pub struct FolderCache {
    folders: Vec<Folder>,
}

impl FolderCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the cache has been populated.
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// Cached folders, optionally including hidden ones.
    pub fn folders(&self, include_hidden: bool) -> Vec<&Folder> {
        self.folders
            .iter()
            .filter(|folder| include_hidden || !folder.is_hidden)
            .collect()
    }

    /// Look up a cached folder by ID.
    pub fn by_id(&self, folder_id: &str) -> Option<&Folder> {
        self.folders.iter().find(|folder| folder.id == folder_id)
    }

    /// Look up a cached folder by display name.
    pub fn by_name(&self, name: &str, case_sensitive: bool) -> Option<&Folder> {
        find_by_name_ref(&self.folders, name, case_sensitive)
    }

    /// Drop all cached folders.
    pub fn clear(&mut self) {
        self.folders.clear();
    }

    pub(crate) fn replace(&mut self, folders: Vec<Folder>) {
        self.folders = folders;
    }
}

fn find_by_name_ref<'a>(folders: &'a [Folder], name: &str, case_sensitive: bool) -> Option<&'a Folder> {
    folders.iter().find(|folder| {
        if case_sensitive {
            folder.display_name == name
        } else {
            folder.display_name.eq_ignore_ascii_case(name)
        }
    })
}
