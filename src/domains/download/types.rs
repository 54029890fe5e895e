use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// A file registered for one-time retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEntry {
    pub path: PathBuf,
    pub content_type: String,
    /// Keep the file on disk after it has been taken or has expired
    pub keep: bool,
    pub expires_at: DateTime<Utc>,
}

impl DownloadEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
