//! Durable persistence for cached credential state.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A single cached token entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    /// The bearer token string.
    pub access_token: String,
    /// When the token stops being usable for silent acquisition.
    pub expires_at: DateTime<Utc>,
    /// Account the token was issued to, when known.
    #[serde(default)]
    pub account: Option<String>,
    /// Scopes the token was issued for.
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Serialized credential state: one entry per normalized scope key.
///
/// The dirty flag tracks whether the in-memory state differs from the last
/// persisted copy; it is never serialized.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialState {
    #[serde(default)]
    entries: BTreeMap<String, CachedToken>,
    #[serde(skip)]
    dirty: bool,
}

/// File-backed store for credential state.
///
/// All mutating operations serialize through a single mutex scoped to the
/// store instance. The backing file is read once at construction and only
/// rewritten when the state actually changed since the last write.
#[derive(Debug)]
pub struct TokenCacheStore {
    path: Option<PathBuf>,
    state: Mutex<CredentialState>,
}

impl TokenCacheStore {
    /// Create a store backed by `path`, loading any existing state.
    ///
    /// A missing file yields an empty store. A file that exists but cannot
    /// be read or deserialized fails with [`Error::CacheCorrupt`]; invalid
    /// state is never silently discarded.
    pub fn new(path: Option<PathBuf>) -> Result<Self> {
        let state = match &path {
            Some(path) => Self::load(path)?,
            None => CredentialState::default(),
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    fn load(path: &Path) -> Result<CredentialState> {
        if !path.exists() {
            return Ok(CredentialState::default());
        }
        let raw = fs::read_to_string(path)
            .map_err(|err| Error::CacheCorrupt(format!("failed to read {}: {err}", path.display())))?;
        if raw.is_empty() {
            return Ok(CredentialState::default());
        }
        let state: CredentialState = serde_json::from_str(&raw).map_err(|err| {
            Error::CacheCorrupt(format!("invalid state in {}: {err}", path.display()))
        })?;
        tracing::debug!(
            entries = state.entries.len(),
            path = %path.display(),
            "loaded token cache"
        );
        Ok(state)
    }

    /// Look up the cached entry for a scope key.
    pub fn lookup(&self, key: &str) -> Option<CachedToken> {
        let state = self.state.lock().expect("token cache lock poisoned");
        state.entries.get(key).cloned()
    }

    /// Store an entry for a scope key.
    ///
    /// Writing an entry identical to the current one leaves the dirty flag
    /// untouched, so a later [`persist`](Self::persist) stays a no-op.
    pub fn store_token(&self, key: &str, token: CachedToken) {
        let mut state = self.state.lock().expect("token cache lock poisoned");
        if state.entries.get(key) == Some(&token) {
            return;
        }
        state.entries.insert(key.to_string(), token);
        state.dirty = true;
    }

    /// Write the state to the backing file if it changed since the last
    /// write.
    ///
    /// The file is replaced atomically (temp file + rename) so a concurrent
    /// reader never observes a partial write. Without a backing path, or
    /// with a clean state, this is a no-op.
    pub fn persist(&self) -> Result<()> {
        let mut state = self.state.lock().expect("token cache lock poisoned");
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !state.dirty {
            return Ok(());
        }

        let data = serde_json::to_string_pretty(&*state)
            .map_err(|err| Error::CachePersist(format!("serialization failed: {err}")))?;
        write_atomically(path, &data)
            .map_err(|err| Error::CachePersist(format!("failed to write {}: {err}", path.display())))?;
        state.dirty = false;
        tracing::debug!(path = %path.display(), "persisted token cache");
        Ok(())
    }

    /// Reset the in-memory state and delete the backing file.
    ///
    /// A file that is already absent counts as success; any other removal
    /// failure is a [`Error::CachePersist`].
    pub fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().expect("token cache lock poisoned");
        state.entries.clear();
        state.dirty = false;
        if let Some(path) = &self.path {
            match fs::remove_file(path) {
                Ok(()) => tracing::debug!(path = %path.display(), "cleared token cache"),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(Error::CachePersist(format!(
                        "failed to remove {}: {err}",
                        path.display()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Whether unpersisted changes exist.
    pub fn is_dirty(&self) -> bool {
        self.state.lock().expect("token cache lock poisoned").dirty
    }
}

fn write_atomically(path: &Path, data: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn sample_token(access_token: &str) -> CachedToken {
        CachedToken {
            access_token: access_token.to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            account: Some("ada@example.com".to_string()),
            scopes: vec!["Mail.Read".to_string()],
        }
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = TokenCacheStore::new(Some(dir.path().join("cache.json"))).unwrap();
        assert!(store.lookup("Mail.Read").is_none());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_store_persist_reload_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let store = TokenCacheStore::new(Some(path.clone())).unwrap();
        store.store_token("Mail.Read", sample_token("tok-1"));
        assert!(store.is_dirty());
        store.persist().unwrap();
        assert!(!store.is_dirty());

        let reloaded = TokenCacheStore::new(Some(path)).unwrap();
        let entry = reloaded.lookup("Mail.Read").unwrap();
        assert_eq!(entry.access_token, "tok-1");
        assert_eq!(entry.account.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_persist_is_noop_when_clean() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        let store = TokenCacheStore::new(Some(path.clone())).unwrap();
        store.store_token("Mail.Read", sample_token("tok-1"));
        store.persist().unwrap();

        // Scribble over the file; a clean store must not rewrite it.
        fs::write(&path, "sentinel").unwrap();
        store.persist().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "sentinel");
    }

    #[test]
    fn test_identical_entry_does_not_mark_dirty() {
        let dir = TempDir::new().unwrap();
        let store = TokenCacheStore::new(Some(dir.path().join("cache.json"))).unwrap();

        let token = sample_token("tok-1");
        store.store_token("Mail.Read", token.clone());
        store.persist().unwrap();

        store.store_token("Mail.Read", token);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_corrupt_file_fails_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{\"entries\": truncated").unwrap();

        let err = TokenCacheStore::new(Some(path)).unwrap_err();
        assert!(matches!(err, Error::CacheCorrupt(_)));
    }

    #[test]
    fn test_empty_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "").unwrap();

        let store = TokenCacheStore::new(Some(path)).unwrap();
        assert!(store.lookup("anything").is_none());
    }

    #[test]
    fn test_clear_removes_file_and_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        let store = TokenCacheStore::new(Some(path.clone())).unwrap();
        store.store_token("Mail.Read", sample_token("tok-1"));
        store.persist().unwrap();
        assert!(path.exists());

        store.clear().unwrap();
        assert!(!path.exists());
        assert!(store.lookup("Mail.Read").is_none());

        // Clearing again with the file already absent still succeeds.
        store.clear().unwrap();
    }

    #[test]
    fn test_store_without_path_persists_in_memory_only() {
        let store = TokenCacheStore::new(None).unwrap();
        store.store_token("Mail.Read", sample_token("tok-1"));
        store.persist().unwrap();
        store.clear().unwrap();
        assert!(store.lookup("Mail.Read").is_none());
    }
}
