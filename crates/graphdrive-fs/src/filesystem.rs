//! The `Filesystem` facade.
//!
//! Normalises every path, applies the existence checks callers rely on
//! (no silent overwrite on `write`, no phantom reads), and forwards to the
//! adapter. Extension operations appear only when the adapter supports
//! them.

use crate::adapter::{
    DriveInfo, DriveManager, FilesystemAdapter, Invitation, ReadStream, UrlProvider, UserInviter,
};
use crate::config::Config;
use crate::error::{FsError, FsResult};
use crate::metadata::Metadata;
use crate::path::{self, normalize_path};

const FALLBACK_MIMETYPE: &str = "application/octet-stream";

/// Storage-agnostic filesystem handle.
pub struct Filesystem<A> {
    adapter: A,
    config: Config,
}

impl<A: FilesystemAdapter> Filesystem<A> {
    pub fn new(adapter: A) -> Self {
        Self::with_config(adapter, Config::new())
    }

    /// Create a facade whose default options apply to every call.
    pub fn with_config(adapter: A, config: Config) -> Self {
        Self { adapter, config }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_adapter(self) -> A {
        self.adapter
    }

    // ─── Checks ──────────────────────────────────────────────────────

    /// Normalise a path that must name a file, never the root.
    fn file_path(path: &str) -> FsResult<String> {
        let path = normalize_path(path)?;
        if path.is_empty() {
            return Err(FsError::RootViolation);
        }
        Ok(path)
    }

    async fn assert_present(&self, path: &str, config: &Config) -> FsResult<()> {
        if config.disable_asserts() || self.adapter.has(path).await? {
            Ok(())
        } else {
            Err(FsError::FileNotFound(path.to_string()))
        }
    }

    async fn assert_absent(&self, path: &str, config: &Config) -> FsResult<()> {
        if !config.disable_asserts() && self.adapter.has(path).await? {
            Err(FsError::FileExists(path.to_string()))
        } else {
            Ok(())
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────

    /// Whether a path exists. The root never "exists" as an entry.
    pub async fn has(&self, path: &str) -> FsResult<bool> {
        let path = normalize_path(path)?;
        if path.is_empty() {
            return Ok(false);
        }
        self.adapter.has(&path).await
    }

    pub async fn read(&self, path: &str) -> FsResult<Vec<u8>> {
        let path = normalize_path(path)?;
        self.assert_present(&path, &self.config).await?;
        self.adapter.read(&path).await
    }

    /// Read a file as UTF-8 text.
    pub async fn read_to_string(&self, path: &str) -> FsResult<String> {
        let bytes = self.read(path).await?;
        String::from_utf8(bytes).map_err(|e| FsError::InvalidArgument(e.to_string()))
    }

    pub async fn read_stream(&self, path: &str) -> FsResult<ReadStream> {
        let path = normalize_path(path)?;
        self.assert_present(&path, &self.config).await?;
        self.adapter.read_stream(&path).await
    }

    /// List a directory. Entries outside `directory` are dropped and the
    /// result is ordered by path.
    pub async fn list_contents(&self, directory: &str, recursive: bool) -> FsResult<Vec<Metadata>> {
        let directory = normalize_path(directory)?;
        let mut listing: Vec<Metadata> = self
            .adapter
            .list_contents(&directory, recursive)
            .await?
            .into_iter()
            .filter(|m| {
                if recursive {
                    path::resides_in(&directory, &m.path)
                } else {
                    path::dirname(&m.path) == directory && !m.path.is_empty()
                }
            })
            .collect();
        listing.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(listing)
    }

    pub async fn get_metadata(&self, path: &str) -> FsResult<Metadata> {
        let path = normalize_path(path)?;
        self.assert_present(&path, &self.config).await?;
        self.adapter.get_metadata(&path).await
    }

    pub async fn get_size(&self, path: &str) -> FsResult<u64> {
        let path = normalize_path(path)?;
        self.assert_present(&path, &self.config).await?;
        self.adapter.get_size(&path).await
    }

    pub async fn get_timestamp(&self, path: &str) -> FsResult<i64> {
        let path = normalize_path(path)?;
        self.assert_present(&path, &self.config).await?;
        self.adapter.get_timestamp(&path).await
    }

    /// MIME type reported by the backend, or guessed from the extension.
    pub async fn get_mimetype(&self, path: &str) -> FsResult<String> {
        let path = normalize_path(path)?;
        self.assert_present(&path, &self.config).await?;
        match self.adapter.get_mimetype(&path).await {
            Ok(mimetype) => Ok(mimetype),
            Err(FsError::MetadataUnavailable { .. }) => Ok(guess_mimetype(&path)),
            Err(e) => Err(e),
        }
    }

    // ─── Writes ──────────────────────────────────────────────────────

    pub async fn write(&self, path: &str, contents: &[u8]) -> FsResult<Metadata> {
        self.write_with_config(path, contents, &Config::new()).await
    }

    pub async fn write_with_config(
        &self,
        path: &str,
        contents: &[u8],
        config: &Config,
    ) -> FsResult<Metadata> {
        let path = Self::file_path(path)?;
        let config = config.with_fallback(&self.config);
        self.assert_absent(&path, &config).await?;
        self.adapter.write(&path, contents, &config).await
    }

    pub async fn write_stream(&self, path: &str, stream: ReadStream) -> FsResult<Metadata> {
        self.write_stream_with_config(path, stream, &Config::new()).await
    }

    pub async fn write_stream_with_config(
        &self,
        path: &str,
        stream: ReadStream,
        config: &Config,
    ) -> FsResult<Metadata> {
        let path = Self::file_path(path)?;
        let config = config.with_fallback(&self.config);
        self.assert_absent(&path, &config).await?;
        self.adapter.write_stream(&path, stream, &config).await
    }

    pub async fn update(&self, path: &str, contents: &[u8]) -> FsResult<Metadata> {
        self.update_with_config(path, contents, &Config::new()).await
    }

    pub async fn update_with_config(
        &self,
        path: &str,
        contents: &[u8],
        config: &Config,
    ) -> FsResult<Metadata> {
        let path = Self::file_path(path)?;
        let config = config.with_fallback(&self.config);
        self.assert_present(&path, &config).await?;
        self.adapter.update(&path, contents, &config).await
    }

    pub async fn update_stream(&self, path: &str, stream: ReadStream) -> FsResult<Metadata> {
        let path = Self::file_path(path)?;
        let config = self.config.clone();
        self.assert_present(&path, &config).await?;
        self.adapter.update_stream(&path, stream, &config).await
    }

    /// Create or replace a file.
    pub async fn put(&self, path: &str, contents: &[u8]) -> FsResult<Metadata> {
        let path = Self::file_path(path)?;
        if self.adapter.has(&path).await? {
            self.adapter.update(&path, contents, &self.config).await
        } else {
            self.adapter.write(&path, contents, &self.config).await
        }
    }

    pub async fn read_and_delete(&self, path: &str) -> FsResult<Vec<u8>> {
        let path = normalize_path(path)?;
        self.assert_present(&path, &self.config).await?;
        let contents = self.adapter.read(&path).await?;
        self.adapter.delete(&path).await?;
        Ok(contents)
    }

    pub async fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        let from = Self::file_path(from)?;
        let to = Self::file_path(to)?;
        self.assert_present(&from, &self.config).await?;
        self.assert_absent(&to, &self.config).await?;
        self.adapter.rename(&from, &to).await
    }

    pub async fn copy(&self, from: &str, to: &str) -> FsResult<()> {
        let from = Self::file_path(from)?;
        let to = Self::file_path(to)?;
        self.assert_present(&from, &self.config).await?;
        self.assert_absent(&to, &self.config).await?;
        self.adapter.copy(&from, &to).await
    }

    pub async fn delete(&self, path: &str) -> FsResult<()> {
        let path = normalize_path(path)?;
        self.assert_present(&path, &self.config).await?;
        self.adapter.delete(&path).await
    }

    pub async fn delete_dir(&self, path: &str) -> FsResult<()> {
        let path = normalize_path(path)?;
        if path.is_empty() {
            return Err(FsError::RootViolation);
        }
        self.adapter.delete_dir(&path).await
    }

    pub async fn create_dir(&self, path: &str) -> FsResult<Metadata> {
        let path = normalize_path(path)?;
        self.adapter.create_dir(&path, &self.config).await
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Extension operations
// ═══════════════════════════════════════════════════════════════════════

impl<A: UrlProvider> Filesystem<A> {
    pub async fn get_url(&self, path: &str) -> FsResult<String> {
        let path = normalize_path(path)?;
        self.assert_present(&path, &self.config).await?;
        self.adapter.get_url(&path).await
    }
}

impl<A: DriveManager> Filesystem<A> {
    pub async fn create_drive(&self, name: &str) -> FsResult<DriveInfo> {
        self.adapter.create_drive(validate_drive_name(name)?).await
    }

    pub async fn delete_drive(&self, name: &str) -> FsResult<()> {
        self.adapter.delete_drive(validate_drive_name(name)?).await
    }
}

impl<A: UserInviter> Filesystem<A> {
    pub async fn invite_user(&self, path: &str, email: &str) -> FsResult<Invitation> {
        let path = normalize_path(path)?;
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(FsError::InvalidArgument(format!(
                "not an e-mail address: {:?}",
                email
            )));
        }
        self.assert_present(&path, &self.config).await?;
        self.adapter.invite_user(&path, email).await
    }
}

fn validate_drive_name(name: &str) -> FsResult<&str> {
    let name = name.trim();
    if name.is_empty() || name.contains('/') || name.contains('\\') {
        return Err(FsError::InvalidArgument(format!(
            "invalid drive name: {:?}",
            name
        )));
    }
    Ok(name)
}

fn guess_mimetype(path: &str) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(FALLBACK_MIMETYPE)
        .to_string()
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
