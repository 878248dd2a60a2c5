//! [`FilesystemAdapter`] implementation backed by SharePoint document
//! libraries.
//!
//! With a bound `drive_name` every path is relative to that library. Without
//! one the first path segment names the library (`Documents/a/b.txt`), and
//! listing the empty path enumerates the site's libraries.

use crate::api_client::GraphApiClient;
use crate::drives::SharepointDrives;
use crate::error::{GraphError, GraphResult};
use crate::files::SharepointFiles;
use crate::metadata::normalize_item;
use crate::paths::{split_drive, with_drive};
use crate::sharing::{SharepointSharing, DEFAULT_INVITE_ROLE};
use crate::types::{ConflictBehavior, Drive, SharepointConfig};
use async_trait::async_trait;
use bytes::Bytes;
use graphdrive_fs::{
    Config, ConflictPolicy, DriveInfo, DriveManager, FilesystemAdapter, FsError, FsResult,
    Invitation, Metadata, ReadStream, UrlProvider, UserInviter,
};
use log::{debug, info};
use std::collections::HashMap;
use std::io::SeekFrom;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::RwLock;

/// Where a facade path lands: which library, and where inside it.
#[derive(Debug, Clone)]
struct Scope {
    drive_name: String,
    drive_id: String,
    inner: String,
}

/// SharePoint-backed storage adapter.
pub struct SharepointAdapter {
    config: Arc<SharepointConfig>,
    client: GraphApiClient,
    /// Library name → drive id.
    drive_ids: RwLock<HashMap<String, String>>,
}

impl SharepointAdapter {
    /// Validate the configuration and build the HTTP client. No network
    /// traffic happens until the first call.
    pub fn new(config: SharepointConfig) -> GraphResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let client = GraphApiClient::new(config.clone())?;
        Ok(Self {
            config,
            client,
            drive_ids: RwLock::new(HashMap::new()),
        })
    }

    /// Build and immediately [`initialize`](Self::initialize).
    pub async fn connect(config: SharepointConfig) -> GraphResult<Self> {
        let adapter = Self::new(config)?;
        adapter.initialize().await?;
        Ok(adapter)
    }

    /// Acquire a token and resolve the bound library, so bad credentials
    /// or a missing library surface before the first file operation.
    pub async fn initialize(&self) -> GraphResult<()> {
        self.client.tokens().access_token().await?;
        if let Some(name) = &self.config.drive_name {
            let id = self.drive_id(name).await?;
            info!("Bound to library {} (drive {})", name, id);
        } else {
            info!("Connected to site {}", self.config.site_id);
        }
        Ok(())
    }

    pub fn config(&self) -> &SharepointConfig {
        &self.config
    }

    pub fn client(&self) -> &GraphApiClient {
        &self.client
    }

    fn drives(&self) -> SharepointDrives<'_> {
        SharepointDrives::new(&self.client, &self.config.site_id)
    }

    fn files(&self, drive_id: &str) -> SharepointFiles<'_> {
        SharepointFiles::new(&self.client, drive_id)
            .with_upload_limits(self.config.simple_upload_max, self.config.upload_chunk_size)
    }

    /// Drive id for a library name, cached per adapter.
    async fn drive_id(&self, name: &str) -> GraphResult<String> {
        if let Some(id) = self.drive_ids.read().await.get(name) {
            return Ok(id.clone());
        }
        let drive = self.drives().find_by_name(name).await?;
        debug!("Resolved library {} -> {}", name, drive.id);
        self.drive_ids
            .write()
            .await
            .insert(name.to_string(), drive.id.clone());
        Ok(drive.id)
    }

    async fn resolve(&self, path: &str) -> FsResult<Scope> {
        let (drive_name, inner) = match &self.config.drive_name {
            Some(bound) => (bound.as_str(), path),
            None => split_drive(path),
        };
        if drive_name.is_empty() {
            return Err(FsError::InvalidArgument(
                "path must start with a document library name".into(),
            ));
        }
        let drive_id = self
            .drive_id(drive_name)
            .await
            .map_err(|e| e.into_fs(path))?;
        Ok(Scope {
            drive_name: drive_name.to_string(),
            drive_id,
            inner: inner.to_string(),
        })
    }

    /// The facade path for a drive-relative path in `scope`'s library.
    fn external(&self, scope: &Scope, inner: &str) -> String {
        if self.config.drive_name.is_some() {
            inner.to_string()
        } else {
            with_drive(&scope.drive_name, inner)
        }
    }

    fn is_unbound_root(&self, path: &str) -> bool {
        self.config.drive_name.is_none() && path.is_empty()
    }

    async fn upload(
        &self,
        path: &str,
        contents: &[u8],
        config: &Config,
        conflict: ConflictBehavior,
    ) -> FsResult<Metadata> {
        let scope = self.resolve(path).await?;
        if scope.inner.is_empty() {
            return Err(FsError::InvalidArgument(format!(
                "cannot write to the root of library {}",
                scope.drive_name
            )));
        }
        let content_type = content_type(path, config);
        let item = self
            .files(&scope.drive_id)
            .upload(
                &scope.inner,
                Bytes::copy_from_slice(contents),
                &content_type,
                conflict,
            )
            .await
            .map_err(|e| e.into_fs(path))?;
        Ok(normalize_item(&item, path))
    }

    /// Spool `stream` to an anonymous temp file so its size is known, then
    /// upload with a single PUT or an upload session.
    async fn upload_stream(
        &self,
        path: &str,
        mut stream: ReadStream,
        config: &Config,
        conflict: ConflictBehavior,
    ) -> FsResult<Metadata> {
        let scope = self.resolve(path).await?;
        if scope.inner.is_empty() {
            return Err(FsError::InvalidArgument(format!(
                "cannot write to the root of library {}",
                scope.drive_name
            )));
        }

        let spool = tokio::task::spawn_blocking(tempfile::tempfile)
            .await
            .map_err(|e| FsError::backend(GraphError::internal(e.to_string())))??;
        let mut file = tokio::fs::File::from_std(spool);
        let size = tokio::io::copy(&mut stream, &mut file).await?;
        file.seek(SeekFrom::Start(0)).await?;
        debug!("Spooled {} bytes for {}", size, path);

        let files = self.files(&scope.drive_id);
        let result = if size <= self.config.simple_upload_max {
            let mut buf = Vec::with_capacity(size as usize);
            file.read_to_end(&mut buf).await?;
            files
                .upload_small(&scope.inner, Bytes::from(buf), &content_type(path, config), conflict)
                .await
        } else {
            files
                .upload_from_reader(&scope.inner, file, size, conflict)
                .await
        };
        let item = result.map_err(|e| e.into_fs(path))?;
        Ok(normalize_item(&item, path))
    }

    /// Resolve two paths that must live in the same library.
    async fn resolve_pair(&self, from: &str, to: &str, op: &'static str) -> FsResult<(Scope, Scope)> {
        let source = self.resolve(from).await?;
        let target = self.resolve(to).await?;
        if source.drive_id != target.drive_id {
            return Err(FsError::Unsupported(op));
        }
        if source.inner.is_empty() || target.inner.is_empty() {
            return Err(FsError::RootViolation);
        }
        Ok((source, target))
    }

    async fn list_libraries(&self, recursive: bool) -> FsResult<Vec<Metadata>> {
        let drives = self.drives().list_site_drives().await?;
        let mut out = Vec::new();
        for drive in drives {
            let Some(name) = drive.name.clone() else {
                continue;
            };
            self.drive_ids
                .write()
                .await
                .insert(name.clone(), drive.id.clone());
            out.push(drive_metadata(&drive, &name));
            if recursive {
                out.extend(self.list_contents(&name, true).await?);
            }
        }
        Ok(out)
    }
}

fn drive_metadata(drive: &Drive, name: &str) -> Metadata {
    let mut meta = Metadata::dir(name);
    meta.url = drive.web_url.clone();
    meta.timestamp = drive
        .last_modified_date_time
        .as_deref()
        .and_then(crate::metadata::parse_timestamp);
    meta
}

/// Explicit `mimetype` option, else a guess from the extension.
fn content_type(path: &str, config: &Config) -> String {
    match config.mimetype() {
        Some(m) => m.to_string(),
        None => mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string(),
    }
}

fn conflict_for_write(config: &Config) -> ConflictBehavior {
    config
        .conflict()
        .unwrap_or(ConflictPolicy::Replace)
        .into()
}

#[async_trait]
impl FilesystemAdapter for SharepointAdapter {
    async fn write(&self, path: &str, contents: &[u8], config: &Config) -> FsResult<Metadata> {
        self.upload(path, contents, config, conflict_for_write(config))
            .await
    }

    async fn write_stream(
        &self,
        path: &str,
        stream: ReadStream,
        config: &Config,
    ) -> FsResult<Metadata> {
        self.upload_stream(path, stream, config, conflict_for_write(config))
            .await
    }

    async fn update(&self, path: &str, contents: &[u8], config: &Config) -> FsResult<Metadata> {
        self.upload(path, contents, config, ConflictBehavior::Replace)
            .await
    }

    async fn update_stream(
        &self,
        path: &str,
        stream: ReadStream,
        config: &Config,
    ) -> FsResult<Metadata> {
        self.upload_stream(path, stream, config, ConflictBehavior::Replace)
            .await
    }

    async fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        let (source, target) = self.resolve_pair(from, to, "rename across libraries").await?;
        self.files(&source.drive_id)
            .move_item(&source.inner, &target.inner)
            .await
            .map_err(|e| e.into_fs(from))?;
        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> FsResult<()> {
        let (source, target) = self.resolve_pair(from, to, "copy across libraries").await?;
        self.files(&source.drive_id)
            .copy_item(&source.inner, &target.inner)
            .await
            .map_err(|e| e.into_fs(from))
    }

    async fn delete(&self, path: &str) -> FsResult<()> {
        let scope = self.resolve(path).await?;
        if scope.inner.is_empty() {
            return Err(FsError::RootViolation);
        }
        self.files(&scope.drive_id)
            .delete(&scope.inner)
            .await
            .map_err(|e| e.into_fs(path))
    }

    async fn delete_dir(&self, path: &str) -> FsResult<()> {
        let scope = self.resolve(path).await?;
        if scope.inner.is_empty() {
            return Err(FsError::RootViolation);
        }
        self.files(&scope.drive_id)
            .delete(&scope.inner)
            .await
            .map_err(|e| e.into_fs(path))
    }

    async fn create_dir(&self, path: &str, _config: &Config) -> FsResult<Metadata> {
        let scope = self.resolve(path).await?;
        let files = self.files(&scope.drive_id);
        let item = if scope.inner.is_empty() {
            files.get_item("").await
        } else {
            files.create_folder(&scope.inner).await
        }
        .map_err(|e| e.into_fs(path))?;
        Ok(normalize_item(&item, path))
    }

    async fn has(&self, path: &str) -> FsResult<bool> {
        let scope = match self.resolve(path).await {
            Ok(scope) => scope,
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(e),
        };
        if scope.inner.is_empty() {
            return Ok(true);
        }
        let item = self
            .files(&scope.drive_id)
            .try_get_item(&scope.inner)
            .await?;
        Ok(item.is_some())
    }

    async fn read(&self, path: &str) -> FsResult<Vec<u8>> {
        let scope = self.resolve(path).await?;
        let bytes = self
            .files(&scope.drive_id)
            .download(&scope.inner)
            .await
            .map_err(|e| e.into_fs(path))?;
        Ok(bytes.to_vec())
    }

    async fn read_stream(&self, path: &str) -> FsResult<ReadStream> {
        let scope = self.resolve(path).await?;
        self.files(&scope.drive_id)
            .download_stream(&scope.inner)
            .await
            .map_err(|e| e.into_fs(path))
    }

    async fn list_contents(&self, directory: &str, recursive: bool) -> FsResult<Vec<Metadata>> {
        if self.is_unbound_root(directory) {
            return self.list_libraries(recursive).await;
        }
        let scope = self.resolve(directory).await?;
        let files = self.files(&scope.drive_id);
        if recursive {
            let items = files
                .list_recursive(&scope.inner)
                .await
                .map_err(|e| e.into_fs(directory))?;
            Ok(items
                .iter()
                .map(|(rel, item)| normalize_item(item, &self.external(&scope, rel)))
                .collect())
        } else {
            let items = files
                .list_children(&scope.inner)
                .await
                .map_err(|e| e.into_fs(directory))?;
            Ok(items
                .iter()
                .map(|item| {
                    let name = item.name.as_deref().unwrap_or_default();
                    let rel = graphdrive_fs::path::join(&scope.inner, name);
                    normalize_item(item, &self.external(&scope, &rel))
                })
                .collect())
        }
    }

    async fn get_metadata(&self, path: &str) -> FsResult<Metadata> {
        let scope = self.resolve(path).await?;
        let item = self
            .files(&scope.drive_id)
            .get_item(&scope.inner)
            .await
            .map_err(|e| e.into_fs(path))?;
        Ok(normalize_item(&item, path))
    }
}

#[async_trait]
impl UrlProvider for SharepointAdapter {
    async fn get_url(&self, path: &str) -> FsResult<String> {
        let scope = self.resolve(path).await?;
        let item = self
            .files(&scope.drive_id)
            .get_item(&scope.inner)
            .await
            .map_err(|e| e.into_fs(path))?;
        item.web_url.ok_or_else(|| FsError::MetadataUnavailable {
            path: path.to_string(),
            field: "url",
        })
    }
}

#[async_trait]
impl DriveManager for SharepointAdapter {
    async fn create_drive(&self, name: &str) -> FsResult<DriveInfo> {
        let drive = self.drives().create_document_library(name).await?;
        self.drive_ids
            .write()
            .await
            .insert(name.to_string(), drive.id.clone());
        Ok(DriveInfo {
            id: drive.id,
            name: drive.name.unwrap_or_else(|| name.to_string()),
            url: drive.web_url,
        })
    }

    async fn delete_drive(&self, name: &str) -> FsResult<()> {
        let id = self.drive_id(name).await.map_err(|e| e.into_fs(name))?;
        self.drives()
            .delete_document_library(&id)
            .await
            .map_err(|e| e.into_fs(name))?;
        self.drive_ids.write().await.remove(name);
        Ok(())
    }
}

#[async_trait]
impl UserInviter for SharepointAdapter {
    async fn invite_user(&self, path: &str, email: &str) -> FsResult<Invitation> {
        let scope = self.resolve(path).await?;
        let item = self
            .files(&scope.drive_id)
            .get_item(&scope.inner)
            .await
            .map_err(|e| e.into_fs(path))?;
        let perms = SharepointSharing::new(&self.client, &scope.drive_id)
            .invite(&item.id, email, &[DEFAULT_INVITE_ROLE])
            .await?;

        let mut roles: Vec<String> = perms.iter().flat_map(|p| p.roles.clone()).collect();
        roles.sort();
        roles.dedup();
        if roles.is_empty() {
            roles.push(DEFAULT_INVITE_ROLE.to_string());
        }
        Ok(Invitation {
            path: path.to_string(),
            recipient: email.to_string(),
            roles,
            permission_ids: perms.into_iter().map(|p| p.id).collect(),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
