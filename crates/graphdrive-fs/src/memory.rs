//! In-memory adapter.
//!
//! Keeps every entry in a sorted map behind a tokio `RwLock`. Writing a
//! file implicitly creates its parent directories, mirroring how drive
//! backends create intermediate folders on upload.

use crate::adapter::{FilesystemAdapter, ReadStream, UrlProvider};
use crate::config::Config;
use crate::error::{FsError, FsResult};
use crate::metadata::Metadata;
use crate::path;
use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use std::collections::BTreeMap;
use std::io::Cursor;
use tokio::io::AsyncReadExt;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
enum Entry {
    File {
        contents: Vec<u8>,
        mimetype: Option<String>,
        modified: i64,
    },
    Dir {
        modified: i64,
    },
}

/// Fully in-memory [`FilesystemAdapter`].
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    entries: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries (files and directories).
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn store_file(&self, path: &str, contents: Vec<u8>, config: &Config) -> Metadata {
        let now = Utc::now().timestamp();
        let mut entries = self.entries.write().await;
        ensure_parents(&mut entries, path, now);
        let size = contents.len() as u64;
        let mimetype = config.mimetype().map(String::from);
        entries.insert(
            path.to_string(),
            Entry::File {
                contents,
                mimetype: mimetype.clone(),
                modified: now,
            },
        );
        debug!("memory: stored {} ({} bytes)", path, size);

        let mut meta = Metadata::file(path).with_size(size).with_timestamp(now);
        meta.mimetype = mimetype;
        meta
    }
}

fn ensure_parents(entries: &mut BTreeMap<String, Entry>, path: &str, now: i64) {
    let mut dir = path::dirname(path);
    while !dir.is_empty() {
        entries
            .entry(dir.to_string())
            .or_insert(Entry::Dir { modified: now });
        dir = path::dirname(dir);
    }
}

fn to_metadata(path: &str, entry: &Entry) -> Metadata {
    match entry {
        Entry::File {
            contents,
            mimetype,
            modified,
        } => {
            let mut meta = Metadata::file(path)
                .with_size(contents.len() as u64)
                .with_timestamp(*modified);
            meta.mimetype = mimetype.clone();
            meta
        }
        Entry::Dir { modified } => Metadata::dir(path).with_timestamp(*modified),
    }
}

/// Keys of `path` itself plus everything beneath it.
fn subtree_keys(entries: &BTreeMap<String, Entry>, path: &str) -> Vec<String> {
    entries
        .keys()
        .filter(|k| k.as_str() == path || path::resides_in(path, k))
        .cloned()
        .collect()
}

async fn drain(mut stream: ReadStream) -> FsResult<Vec<u8>> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    Ok(buf)
}

#[async_trait]
impl FilesystemAdapter for MemoryAdapter {
    async fn write(&self, path: &str, contents: &[u8], config: &Config) -> FsResult<Metadata> {
        Ok(self.store_file(path, contents.to_vec(), config).await)
    }

    async fn write_stream(
        &self,
        path: &str,
        stream: ReadStream,
        config: &Config,
    ) -> FsResult<Metadata> {
        let contents = drain(stream).await?;
        Ok(self.store_file(path, contents, config).await)
    }

    async fn update(&self, path: &str, contents: &[u8], config: &Config) -> FsResult<Metadata> {
        Ok(self.store_file(path, contents.to_vec(), config).await)
    }

    async fn update_stream(
        &self,
        path: &str,
        stream: ReadStream,
        config: &Config,
    ) -> FsResult<Metadata> {
        let contents = drain(stream).await?;
        Ok(self.store_file(path, contents, config).await)
    }

    async fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        let now = Utc::now().timestamp();
        let mut entries = self.entries.write().await;
        let keys = subtree_keys(&entries, from);
        if keys.is_empty() {
            return Err(FsError::FileNotFound(from.to_string()));
        }
        ensure_parents(&mut entries, to, now);
        for key in keys {
            if let Some(entry) = entries.remove(&key) {
                let moved = format!("{}{}", to, &key[from.len()..]);
                entries.insert(moved, entry);
            }
        }
        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> FsResult<()> {
        let now = Utc::now().timestamp();
        let mut entries = self.entries.write().await;
        let entry = match entries.get(from) {
            Some(entry @ Entry::File { .. }) => entry.clone(),
            Some(Entry::Dir { .. }) => return Err(FsError::Unsupported("copy of a directory")),
            None => return Err(FsError::FileNotFound(from.to_string())),
        };
        ensure_parents(&mut entries, to, now);
        entries.insert(to.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, path: &str) -> FsResult<()> {
        let mut entries = self.entries.write().await;
        match entries.get(path) {
            Some(Entry::File { .. }) => {
                entries.remove(path);
                Ok(())
            }
            _ => Err(FsError::FileNotFound(path.to_string())),
        }
    }

    async fn delete_dir(&self, path: &str) -> FsResult<()> {
        let mut entries = self.entries.write().await;
        let keys = subtree_keys(&entries, path);
        if keys.is_empty() {
            return Err(FsError::FileNotFound(path.to_string()));
        }
        for key in keys {
            entries.remove(&key);
        }
        Ok(())
    }

    async fn create_dir(&self, path: &str, _config: &Config) -> FsResult<Metadata> {
        let now = Utc::now().timestamp();
        let mut entries = self.entries.write().await;
        if let Some(Entry::File { .. }) = entries.get(path) {
            return Err(FsError::FileExists(path.to_string()));
        }
        ensure_parents(&mut entries, path, now);
        let entry = entries
            .entry(path.to_string())
            .or_insert(Entry::Dir { modified: now });
        Ok(to_metadata(path, entry))
    }

    async fn has(&self, path: &str) -> FsResult<bool> {
        Ok(self.entries.read().await.contains_key(path))
    }

    async fn read(&self, path: &str) -> FsResult<Vec<u8>> {
        match self.entries.read().await.get(path) {
            Some(Entry::File { contents, .. }) => Ok(contents.clone()),
            _ => Err(FsError::FileNotFound(path.to_string())),
        }
    }

    async fn read_stream(&self, path: &str) -> FsResult<ReadStream> {
        let contents = self.read(path).await?;
        Ok(Box::pin(Cursor::new(contents)))
    }

    async fn list_contents(&self, directory: &str, recursive: bool) -> FsResult<Vec<Metadata>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(k, _)| path::resides_in(directory, k))
            .filter(|(k, _)| recursive || path::dirname(k) == directory)
            .map(|(k, e)| to_metadata(k, e))
            .collect())
    }

    async fn get_metadata(&self, path: &str) -> FsResult<Metadata> {
        self.entries
            .read()
            .await
            .get(path)
            .map(|e| to_metadata(path, e))
            .ok_or_else(|| FsError::FileNotFound(path.to_string()))
    }
}

#[async_trait]
impl UrlProvider for MemoryAdapter {
    async fn get_url(&self, path: &str) -> FsResult<String> {
        if self.has(path).await? {
            Ok(format!("memory://{}", path))
        } else {
            Err(FsError::FileNotFound(path.to_string()))
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
