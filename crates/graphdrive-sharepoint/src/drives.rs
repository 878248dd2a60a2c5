//! Document library management for a SharePoint site: enumerate drives,
//! resolve a library by name, and create / delete libraries through their
//! backing lists.

use crate::api_client::GraphApiClient;
use crate::error::{GraphError, GraphResult};
use crate::types::{Drive, SiteList};
use log::{debug, info};
use serde_json::json;

/// Drive operations scoped to one site.
pub struct SharepointDrives<'a> {
    client: &'a GraphApiClient,
    site_id: &'a str,
}

impl<'a> SharepointDrives<'a> {
    pub fn new(client: &'a GraphApiClient, site_id: &'a str) -> Self {
        Self { client, site_id }
    }

    /// Get a specific drive by ID.
    pub async fn get_drive(&self, drive_id: &str) -> GraphResult<Drive> {
        self.client.get_json(&format!("drives/{}", drive_id)).await
    }

    /// List every document library in the site.
    pub async fn list_site_drives(&self) -> GraphResult<Vec<Drive>> {
        let path = format!("sites/{}/drives", self.site_id);
        let drives: Vec<Drive> = self.client.get_paged(&path, &[]).await?;
        debug!("Site {} has {} drives", self.site_id, drives.len());
        Ok(drives)
    }

    /// Resolve a library by its display name.
    pub async fn find_by_name(&self, name: &str) -> GraphResult<Drive> {
        self.list_site_drives()
            .await?
            .into_iter()
            .find(|d| d.name.as_deref() == Some(name))
            .ok_or_else(|| GraphError::not_found(format!("Drive not found: {}", name)))
    }

    /// Create a document library and return its drive.
    pub async fn create_document_library(&self, name: &str) -> GraphResult<Drive> {
        let body = json!({
            "displayName": name,
            "list": { "template": "documentLibrary" },
        });
        let resp = self
            .client
            .post(&format!("sites/{}/lists", self.site_id), &body)
            .await?;
        let list: SiteList = serde_json::from_value(resp)?;

        let path = format!("sites/{}/lists/{}/drive", self.site_id, list.id);
        let drive: Drive = self.client.get_json(&path).await?;
        info!("Created document library {} (drive {})", name, drive.id);
        Ok(drive)
    }

    /// Delete a document library by removing its backing list.
    pub async fn delete_document_library(&self, drive_id: &str) -> GraphResult<()> {
        let list: SiteList = self
            .client
            .get_json(&format!("drives/{}/list", drive_id))
            .await?;
        self.client
            .delete(&format!("sites/{}/lists/{}", self.site_id, list.id))
            .await?;
        info!("Deleted document library backing drive {}", drive_id);
        Ok(())
    }
}
