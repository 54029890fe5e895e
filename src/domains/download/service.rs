use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::Mutex;

use crate::errors::{DomainError, DomainResult};

use super::types::DownloadEntry;

/// Default lifetime of a registered download
pub const DEFAULT_DOWNLOAD_TTL_SECS: i64 = 60 * 60;

/// Hands out opaque retrieval handles for files on disk
#[async_trait]
pub trait DownloadRegistry: Send + Sync {
    /// Register `path` and return its handle. An empty content type is
    /// inferred from the file extension.
    async fn register_file(&self, path: &Path, content_type: &str, keep: bool) -> DomainResult<String>;
}

/// In-process registry. Handles are random hex strings that expire after a
/// fixed time and can be taken once.
pub struct LocalDownloadStore {
    entries: Mutex<HashMap<String, DownloadEntry>>,
    ttl: Duration,
}

impl Default for LocalDownloadStore {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_DOWNLOAD_TTL_SECS))
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("zip") => "application/zip",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

fn remove_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        log::warn!("error removing download {}: {}", path.display(), e);
    }
}

impl LocalDownloadStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn new_handle() -> String {
        let bytes: [u8; 16] = rand::random();
        hex::encode(bytes)
    }

    /// Look up a registered download without consuming it
    pub async fn entry(&self, handle: &str) -> Option<DownloadEntry> {
        self.entries.lock().await.get(handle).cloned()
    }

    /// Retrieve and forget a registered download. Files not marked `keep`
    /// are removed from disk. Expired or unknown handles yield `None`.
    pub async fn take(&self, handle: &str) -> Option<(DownloadEntry, Vec<u8>)> {
        let entry = self.entries.lock().await.remove(handle)?;

        if entry.is_expired(Utc::now()) {
            if !entry.keep {
                remove_file(&entry.path);
            }
            return None;
        }

        let data = match std::fs::read(&entry.path) {
            Ok(data) => data,
            Err(e) => {
                log::error!("error reading download {}: {}", entry.path.display(), e);
                return None;
            }
        };

        if !entry.keep {
            remove_file(&entry.path);
        }
        Some((entry, data))
    }

    /// Drop expired entries, deleting their files unless kept. Returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(h, _)| h.clone())
            .collect();

        for handle in &expired {
            if let Some(entry) = entries.remove(handle) {
                if !entry.keep {
                    remove_file(&entry.path);
                }
            }
        }
        expired.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DownloadRegistry for LocalDownloadStore {
    async fn register_file(&self, path: &Path, content_type: &str, keep: bool) -> DomainResult<String> {
        if !path.is_file() {
            return Err(DomainError::Io(format!("{} is not a file", path.display())));
        }

        let content_type = if content_type.is_empty() {
            content_type_for(path).to_string()
        } else {
            content_type.to_string()
        };

        let entry = DownloadEntry {
            path: path.to_path_buf(),
            content_type,
            keep,
            expires_at: Utc::now() + self.ttl,
        };

        let mut entries = self.entries.lock().await;
        let mut handle = Self::new_handle();
        while entries.contains_key(&handle) {
            handle = Self::new_handle();
        }
        entries.insert(handle.clone(), entry);

        log::debug!("registered download {} for {}", handle, path.display());
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_take_is_one_time_and_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export1.zip");
        std::fs::write(&path, b"PK").unwrap();

        let store = LocalDownloadStore::default();
        let handle = store.register_file(&path, "", false).await.unwrap();
        assert_eq!(handle.len(), 32);
        assert_eq!(store.entry(&handle).await.unwrap().path, path);

        let (entry, data) = store.take(&handle).await.unwrap();
        assert_eq!(entry.content_type, "application/zip");
        assert_eq!(data, b"PK");
        assert!(!path.exists());
        assert!(store.take(&handle).await.is_none());
    }

    #[tokio::test]
    async fn test_kept_files_survive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"x").unwrap();

        let store = LocalDownloadStore::default();
        let handle = store.register_file(&path, "text/plain", true).await.unwrap();
        let (entry, _) = store.take(&handle).await.unwrap();
        assert_eq!(entry.content_type, "text/plain");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.zip");
        std::fs::write(&path, b"PK").unwrap();

        let store = LocalDownloadStore::new(Duration::zero());
        let handle = store.register_file(&path, "", false).await.unwrap();

        assert_eq!(store.purge_expired().await, 1);
        assert!(store.is_empty().await);
        assert!(!path.exists());
        assert!(store.take(&handle).await.is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_rejected() {
        let store = LocalDownloadStore::default();
        let result = store.register_file(Path::new("/nonexistent/file.zip"), "", false).await;
        assert!(matches!(result, Err(DomainError::Io(_))));
    }
}
