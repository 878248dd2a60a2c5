//! File & folder operations inside one drive, addressed by drive-relative
//! path: download, upload (simple + resumable), folders, delete, move,
//! copy, and listing.

use crate::api_client::{GraphApiClient, UploadRangeResponse};
use crate::error::{GraphError, GraphErrorCode, GraphResult};
use crate::paths::{item_action, item_path};
use crate::types::{
    AsyncOperationStatus, ConflictBehavior, CopyRequest, DriveItem, ItemReference, MoveRequest,
    UploadSession, DEFAULT_SIMPLE_UPLOAD_MAX, DEFAULT_UPLOAD_CHUNK_SIZE,
};
use bytes::Bytes;
use graphdrive_fs::{path as fspath, ReadStream};
use log::{debug, info, warn};
use serde_json::json;
use std::io::Cursor;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};

/// How often a copy monitor is polled, and for how long.
const COPY_POLL_INTERVAL: Duration = Duration::from_millis(500);
const COPY_POLL_ATTEMPTS: u32 = 120;

/// Inclusive byte ranges covering `total` bytes in `chunk`-sized pieces.
pub fn chunk_ranges(total: u64, chunk: u64) -> Vec<(u64, u64)> {
    let mut ranges = Vec::new();
    let mut offset = 0;
    while offset < total {
        let end = std::cmp::min(offset + chunk, total);
        ranges.push((offset, end - 1));
        offset = end;
    }
    ranges
}

/// Path-addressed item operations for a single drive.
pub struct SharepointFiles<'a> {
    client: &'a GraphApiClient,
    drive_id: String,
    simple_upload_max: u64,
    chunk_size: u64,
}

impl<'a> SharepointFiles<'a> {
    pub fn new(client: &'a GraphApiClient, drive_id: &str) -> Self {
        Self {
            client,
            drive_id: drive_id.to_string(),
            simple_upload_max: DEFAULT_SIMPLE_UPLOAD_MAX,
            chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
        }
    }

    /// Override the simple-upload threshold and session chunk size.
    pub fn with_upload_limits(mut self, simple_upload_max: u64, chunk_size: u64) -> Self {
        self.simple_upload_max = simple_upload_max;
        self.chunk_size = chunk_size;
        self
    }

    pub fn drive_id(&self) -> &str {
        &self.drive_id
    }

    // ─── Items ───────────────────────────────────────────────────────

    /// Get item metadata by path.
    pub async fn get_item(&self, path: &str) -> GraphResult<DriveItem> {
        self.client.get_json(&item_path(&self.drive_id, path)).await
    }

    /// Like [`get_item`](Self::get_item) but a missing item is `None`.
    pub async fn try_get_item(&self, path: &str) -> GraphResult<Option<DriveItem>> {
        self.client
            .get_optional(&item_path(&self.drive_id, path))
            .await
    }

    /// Children of a folder, all pages.
    pub async fn list_children(&self, path: &str) -> GraphResult<Vec<DriveItem>> {
        let url = item_action(&self.drive_id, path, "children");
        self.client.get_paged(&url, &[]).await
    }

    /// Every descendant of a folder, depth-first, with drive-relative paths.
    pub async fn list_recursive(&self, path: &str) -> GraphResult<Vec<(String, DriveItem)>> {
        let mut out = Vec::new();
        let mut pending = vec![path.to_string()];
        while let Some(dir) = pending.pop() {
            for item in self.list_children(&dir).await? {
                let name = item.name.clone().unwrap_or_default();
                let child = fspath::join(&dir, &name);
                if item.is_folder() {
                    pending.push(child.clone());
                }
                out.push((child, item));
            }
        }
        debug!("Listed {} items under '{}'", out.len(), path);
        Ok(out)
    }

    // ─── Download ────────────────────────────────────────────────────

    pub async fn download(&self, path: &str) -> GraphResult<Bytes> {
        let url = item_action(&self.drive_id, path, "content");
        self.client.get_bytes(&url).await
    }

    pub async fn download_stream(&self, path: &str) -> GraphResult<ReadStream> {
        let url = item_action(&self.drive_id, path, "content");
        self.client.get_stream(&url).await
    }

    // ─── Upload ──────────────────────────────────────────────────────

    /// Upload bytes, choosing a single PUT or an upload session by size.
    pub async fn upload(
        &self,
        path: &str,
        data: Bytes,
        content_type: &str,
        conflict: ConflictBehavior,
    ) -> GraphResult<DriveItem> {
        let total = data.len() as u64;
        if total <= self.simple_upload_max {
            return self.upload_small(path, data, content_type, conflict).await;
        }
        self.upload_from_reader(path, Cursor::new(data), total, conflict)
            .await
    }

    /// Single-request upload (≤ 4 MiB).
    pub async fn upload_small(
        &self,
        path: &str,
        data: Bytes,
        content_type: &str,
        conflict: ConflictBehavior,
    ) -> GraphResult<DriveItem> {
        let url = format!(
            "{}?@microsoft.graph.conflictBehavior={}",
            item_action(&self.drive_id, path, "content"),
            conflict_str(conflict)
        );
        let resp = self.client.put_bytes(&url, data, content_type).await?;
        let item: DriveItem = serde_json::from_value(resp)?;
        info!("Uploaded {} ({} bytes)", path, item.size.unwrap_or(0));
        Ok(item)
    }

    /// Create a resumable upload session for `path`.
    pub async fn create_upload_session(
        &self,
        path: &str,
        conflict: ConflictBehavior,
    ) -> GraphResult<UploadSession> {
        let url = item_action(&self.drive_id, path, "createUploadSession");
        let body = json!({
            "item": { "@microsoft.graph.conflictBehavior": conflict_str(conflict) }
        });
        let resp = self.client.post(&url, &body).await?;
        Ok(serde_json::from_value(resp)?)
    }

    /// Cancel an in-progress upload session.
    pub async fn cancel_upload_session(&self, upload_url: &str) -> GraphResult<()> {
        self.client.delete_unauthenticated(upload_url).await
    }

    /// Upload `total` bytes read from `reader` through an upload session.
    /// A failed chunk cancels the session before the error is returned.
    pub async fn upload_from_reader<R>(
        &self,
        path: &str,
        mut reader: R,
        total: u64,
        conflict: ConflictBehavior,
    ) -> GraphResult<DriveItem>
    where
        R: AsyncRead + Unpin + Send,
    {
        if total == 0 {
            return Err(GraphError::upload("upload sessions need a non-empty body"));
        }

        let session = self.create_upload_session(path, conflict).await?;
        debug!("Upload session for {} ({} bytes)", path, total);

        match self.send_chunks(&session, &mut reader, total).await {
            Ok(item) => {
                info!("Upload complete: {} ({} bytes)", path, total);
                Ok(item)
            }
            Err(e) => {
                warn!("Upload of {} failed, cancelling session: {}", path, e);
                if let Err(cancel_err) = self.cancel_upload_session(&session.upload_url).await {
                    debug!("Cancelling upload session failed: {}", cancel_err);
                }
                Err(e)
            }
        }
    }

    async fn send_chunks<R>(
        &self,
        session: &UploadSession,
        reader: &mut R,
        total: u64,
    ) -> GraphResult<DriveItem>
    where
        R: AsyncRead + Unpin + Send,
    {
        for (start, end) in chunk_ranges(total, self.chunk_size) {
            let mut chunk = vec![0u8; (end - start + 1) as usize];
            reader.read_exact(&mut chunk).await?;

            match self
                .client
                .put_upload_range(&session.upload_url, Bytes::from(chunk), start, end, total)
                .await?
            {
                UploadRangeResponse::Accepted(_) => continue,
                UploadRangeResponse::Completed(v) => return Ok(serde_json::from_value(v)?),
            }
        }

        Err(GraphError::upload(
            "Upload completed all chunks but no DriveItem was returned",
        ))
    }

    // ─── Folders ─────────────────────────────────────────────────────

    /// Create a folder and any missing ancestors.
    pub async fn create_folder(&self, path: &str) -> GraphResult<DriveItem> {
        let mut parent = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let url = item_action(&self.drive_id, &parent, "children");
            let body = json!({
                "name": segment,
                "folder": {},
                "@microsoft.graph.conflictBehavior": "fail",
            });
            match self.client.post(&url, &body).await {
                Ok(_) => debug!("Created folder {}/{}", parent, segment),
                Err(e) if e.code == GraphErrorCode::Conflict => {}
                Err(e) => return Err(e),
            }
            parent = fspath::join(&parent, segment);
        }

        let item = self.get_item(path).await?;
        if !item.is_folder() {
            return Err(GraphError::new(
                GraphErrorCode::Conflict,
                format!("A file already exists at {}", path),
            ));
        }
        Ok(item)
    }

    // ─── Mutations ───────────────────────────────────────────────────

    pub async fn delete(&self, path: &str) -> GraphResult<()> {
        self.client.delete(&item_path(&self.drive_id, path)).await?;
        info!("Deleted {}", path);
        Ok(())
    }

    /// Move and/or rename an item.
    pub async fn move_item(&self, from: &str, to: &str) -> GraphResult<DriveItem> {
        let source = self.get_item(from).await?;
        let parent = self.ensure_parent(to).await?;
        let body = MoveRequest {
            parent_reference: Some(ItemReference {
                id: Some(parent.id),
                ..Default::default()
            }),
            name: Some(fspath::basename(to).to_string()),
        };
        let url = format!("drives/{}/items/{}", self.drive_id, source.id);
        let resp = self.client.patch(&url, &serde_json::to_value(&body)?).await?;
        info!("Moved {} -> {}", from, to);
        Ok(serde_json::from_value(resp)?)
    }

    /// Copy an item and wait for the asynchronous copy to finish.
    pub async fn copy_item(&self, from: &str, to: &str) -> GraphResult<()> {
        let source = self.get_item(from).await?;
        let parent = self.ensure_parent(to).await?;
        let body = CopyRequest {
            parent_reference: ItemReference {
                drive_id: Some(self.drive_id.clone()),
                id: Some(parent.id),
                path: None,
            },
            name: Some(fspath::basename(to).to_string()),
        };
        let url = format!("drives/{}/items/{}/copy", self.drive_id, source.id);
        let monitor = self
            .client
            .post_accepted(&url, &serde_json::to_value(&body)?)
            .await?;

        if let Some(monitor_url) = monitor {
            self.wait_for_copy(&monitor_url).await?;
        }
        info!("Copied {} -> {}", from, to);
        Ok(())
    }

    async fn wait_for_copy(&self, monitor_url: &str) -> GraphResult<()> {
        for attempt in 0..COPY_POLL_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(COPY_POLL_INTERVAL).await;
            }
            let v = self.client.get_unauthenticated(monitor_url).await?;
            let status: AsyncOperationStatus = serde_json::from_value(v)?;
            debug!(
                "Copy status: {} ({:?}%)",
                status.status, status.percentage_complete
            );
            match status.status.as_str() {
                "completed" => return Ok(()),
                "failed" | "deleteFailed" => {
                    let detail = status
                        .error
                        .as_ref()
                        .and_then(|e| e["message"].as_str())
                        .unwrap_or("copy failed")
                        .to_string();
                    return Err(GraphError::internal(detail));
                }
                _ => {}
            }
        }
        Err(GraphError::internal("Timed out waiting for copy to finish"))
    }

    /// The folder that will contain `path`, created if missing.
    async fn ensure_parent(&self, path: &str) -> GraphResult<DriveItem> {
        let parent = fspath::dirname(path);
        if parent.is_empty() {
            return self.get_item("").await;
        }
        match self.try_get_item(parent).await? {
            Some(item) => Ok(item),
            None => self.create_folder(parent).await,
        }
    }
}

fn conflict_str(conflict: ConflictBehavior) -> &'static str {
    match conflict {
        ConflictBehavior::Fail => "fail",
        ConflictBehavior::Replace => "replace",
        ConflictBehavior::Rename => "rename",
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
