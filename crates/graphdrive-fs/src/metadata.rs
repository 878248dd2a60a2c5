//! The normalised metadata record returned by every adapter.

use crate::path;
use serde::{Deserialize, Serialize};

/// Kind of filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Dir,
}

/// Path / size / timestamp / mimetype record for a single entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Normalised path relative to the adapter root.
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    /// Size in bytes.
    #[serde(alias = "bytes")]
    pub size: Option<u64>,
    /// Last modification, unix seconds.
    pub timestamp: Option<i64>,
    pub mimetype: Option<String>,
    /// Browser-facing URL, when the backend has one.
    pub url: Option<String>,
}

impl Metadata {
    pub fn file(path: impl Into<String>) -> Self {
        Self::new(path, EntryType::File)
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self::new(path, EntryType::Dir)
    }

    fn new(path: impl Into<String>, entry_type: EntryType) -> Self {
        Self {
            path: path.into(),
            entry_type,
            size: None,
            timestamp: None,
            mimetype: None,
            url: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Dir
    }

    pub fn dirname(&self) -> &str {
        path::dirname(&self.path)
    }

    pub fn basename(&self) -> &str {
        path::basename(&self.path)
    }

    pub fn extension(&self) -> Option<&str> {
        path::extension(&self.path)
    }

    pub fn filename(&self) -> &str {
        path::filename(&self.path)
    }
}
