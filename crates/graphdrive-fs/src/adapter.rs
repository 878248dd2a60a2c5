//! The adapter contract every storage backend implements.
//!
//! Paths reaching an adapter have already been normalised by the
//! [`Filesystem`](crate::Filesystem) facade. Adapters do not repeat the
//! facade's existence checks; they report what the backend says.

use crate::config::Config;
use crate::error::{FsError, FsResult};
use crate::metadata::Metadata;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio::io::AsyncRead;

/// Streaming body used for `*_stream` operations.
pub type ReadStream = Pin<Box<dyn AsyncRead + Send>>;

// ═══════════════════════════════════════════════════════════════════════
//  Core trait
// ═══════════════════════════════════════════════════════════════════════

/// Storage backend.
///
/// Implementations must be `Send + Sync` so a single adapter can serve
/// concurrent tasks behind an `Arc`.
#[async_trait]
pub trait FilesystemAdapter: Send + Sync {
    /// Create a file.
    async fn write(&self, path: &str, contents: &[u8], config: &Config) -> FsResult<Metadata>;

    /// Create a file from a stream.
    async fn write_stream(
        &self,
        path: &str,
        stream: ReadStream,
        config: &Config,
    ) -> FsResult<Metadata>;

    /// Replace the contents of an existing file.
    async fn update(&self, path: &str, contents: &[u8], config: &Config) -> FsResult<Metadata>;

    /// Replace the contents of an existing file from a stream.
    async fn update_stream(
        &self,
        path: &str,
        stream: ReadStream,
        config: &Config,
    ) -> FsResult<Metadata>;

    async fn rename(&self, from: &str, to: &str) -> FsResult<()>;

    async fn copy(&self, from: &str, to: &str) -> FsResult<()>;

    async fn delete(&self, path: &str) -> FsResult<()>;

    /// Delete a directory and everything beneath it.
    async fn delete_dir(&self, path: &str) -> FsResult<()>;

    /// Create a directory, including missing parents.
    async fn create_dir(&self, path: &str, config: &Config) -> FsResult<Metadata>;

    /// Existence check. A missing path is `Ok(false)`, not an error.
    async fn has(&self, path: &str) -> FsResult<bool>;

    async fn read(&self, path: &str) -> FsResult<Vec<u8>>;

    async fn read_stream(&self, path: &str) -> FsResult<ReadStream>;

    async fn list_contents(&self, directory: &str, recursive: bool) -> FsResult<Vec<Metadata>>;

    async fn get_metadata(&self, path: &str) -> FsResult<Metadata>;

    async fn get_size(&self, path: &str) -> FsResult<u64> {
        self.get_metadata(path)
            .await?
            .size
            .ok_or_else(|| unavailable(path, "size"))
    }

    async fn get_mimetype(&self, path: &str) -> FsResult<String> {
        self.get_metadata(path)
            .await?
            .mimetype
            .ok_or_else(|| unavailable(path, "mimetype"))
    }

    async fn get_timestamp(&self, path: &str) -> FsResult<i64> {
        self.get_metadata(path)
            .await?
            .timestamp
            .ok_or_else(|| unavailable(path, "timestamp"))
    }
}

fn unavailable(path: &str, field: &'static str) -> FsError {
    FsError::MetadataUnavailable {
        path: path.to_string(),
        field,
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Extensions
// ═══════════════════════════════════════════════════════════════════════

/// A drive (document library) managed through [`DriveManager`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveInfo {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
}

/// Result of [`UserInviter::invite_user`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub path: String,
    pub recipient: String,
    pub roles: Vec<String>,
    /// Backend identifiers of the permissions that were granted.
    pub permission_ids: Vec<String>,
}

/// Backends that can hand out a browser URL for an entry.
#[async_trait]
pub trait UrlProvider: FilesystemAdapter {
    async fn get_url(&self, path: &str) -> FsResult<String>;
}

/// Backends whose top-level containers (drives) can be created and removed.
#[async_trait]
pub trait DriveManager: FilesystemAdapter {
    async fn create_drive(&self, name: &str) -> FsResult<DriveInfo>;

    async fn delete_drive(&self, name: &str) -> FsResult<()>;
}

/// Backends that can share an entry with another user by e-mail.
#[async_trait]
pub trait UserInviter: FilesystemAdapter {
    async fn invite_user(&self, path: &str, email: &str) -> FsResult<Invitation>;
}
