//! Shared types for the SharePoint / Microsoft Graph drive integration.
//!
//! Models cover adapter configuration, drives and their backing lists,
//! drive items (files & folders), upload sessions, copy monitors,
//! permissions, invitations, and OData pagination.

use crate::error::{GraphError, GraphResult};
use graphdrive_fs::ConflictPolicy;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Graph v1.0 root.
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
/// Microsoft identity platform root.
pub const DEFAULT_LOGIN_BASE_URL: &str = "https://login.microsoftonline.com";
/// Upload-session chunks must be multiples of 320 KiB.
pub const UPLOAD_CHUNK_ALIGNMENT: u64 = 320 * 1024;
/// Largest body Graph accepts on a single `PUT …/content` (4 MiB).
pub const DEFAULT_SIMPLE_UPLOAD_MAX: u64 = 4 * 1024 * 1024;
/// Default resumable-upload chunk (10 MiB, 32 × 320 KiB).
pub const DEFAULT_UPLOAD_CHUNK_SIZE: u64 = 10 * 1024 * 1024;
/// Upper bound for `max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

// ═══════════════════════════════════════════════════════════════════════
//  Configuration
// ═══════════════════════════════════════════════════════════════════════

/// Configuration for a SharePoint site connection.
#[derive(Debug, Clone, Deserialize)]
pub struct SharepointConfig {
    /// Entra ID tenant (GUID or verified domain).
    pub tenant_id: String,
    /// Application (client) ID of the app registration.
    pub client_id: String,
    /// Client secret for the client-credentials grant.
    pub client_secret: SecretString,
    /// SharePoint site ID (`host,siteCollectionId,webId` or a GUID).
    pub site_id: String,
    /// Document library bound on initialise. When `None` the first path
    /// segment of every call names the library.
    #[serde(default)]
    pub drive_name: Option<String>,
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,
    #[serde(default = "default_login_base_url")]
    pub login_base_url: String,
    /// Timeout in seconds for HTTP calls.  Default: 60.
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: u64,
    /// Maximum automatic retries for transient failures.  Default: 3.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_simple_upload_max")]
    pub simple_upload_max: u64,
    #[serde(default = "default_upload_chunk_size")]
    pub upload_chunk_size: u64,
}

fn default_graph_base_url() -> String {
    DEFAULT_GRAPH_BASE_URL.into()
}

fn default_login_base_url() -> String {
    DEFAULT_LOGIN_BASE_URL.into()
}

fn default_timeout_sec() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_simple_upload_max() -> u64 {
    DEFAULT_SIMPLE_UPLOAD_MAX
}

fn default_upload_chunk_size() -> u64 {
    DEFAULT_UPLOAD_CHUNK_SIZE
}

impl SharepointConfig {
    /// Configuration with every optional field at its default.
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        site_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
            site_id: site_id.into(),
            drive_name: None,
            graph_base_url: default_graph_base_url(),
            login_base_url: default_login_base_url(),
            timeout_sec: default_timeout_sec(),
            max_retries: default_max_retries(),
            simple_upload_max: default_simple_upload_max(),
            upload_chunk_size: default_upload_chunk_size(),
        }
    }

    /// Bind a document library by name.
    pub fn with_drive(mut self, name: impl Into<String>) -> Self {
        self.drive_name = Some(name.into());
        self
    }

    /// Token endpoint for the client-credentials grant.
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_base_url.trim_end_matches('/'),
            self.tenant_id
        )
    }

    /// Reject configurations that can never work.
    pub fn validate(&self) -> GraphResult<()> {
        let required = [
            ("tenant_id", self.tenant_id.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret().as_str()),
            ("site_id", self.site_id.as_str()),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(GraphError::invalid_config(format!("{} is required", field)));
            }
        }
        if let Some(name) = &self.drive_name {
            if name.trim().is_empty() || name.contains('/') {
                return Err(GraphError::invalid_config(format!(
                    "drive_name {:?} is not a valid library name",
                    name
                )));
            }
        }
        if self.upload_chunk_size == 0 || self.upload_chunk_size % UPLOAD_CHUNK_ALIGNMENT != 0 {
            return Err(GraphError::invalid_config(format!(
                "upload_chunk_size must be a positive multiple of {} bytes",
                UPLOAD_CHUNK_ALIGNMENT
            )));
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(GraphError::invalid_config(format!(
                "max_retries cannot exceed {}",
                MAX_RETRIES_LIMIT
            )));
        }
        if self.simple_upload_max > DEFAULT_SIMPLE_UPLOAD_MAX {
            return Err(GraphError::invalid_config(
                "simple_upload_max cannot exceed 4 MiB",
            ));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Drive
// ═══════════════════════════════════════════════════════════════════════

/// A drive (SharePoint document library).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drive {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub drive_type: Option<String>,
    pub web_url: Option<String>,
    pub created_date_time: Option<String>,
    pub last_modified_date_time: Option<String>,
}

/// A SharePoint list; every document library is backed by one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteList {
    pub id: String,
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub web_url: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════
//  Drive Items  (files, folders)
// ═══════════════════════════════════════════════════════════════════════

/// Core resource representing a file or folder in a drive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: String,
    pub name: Option<String>,
    pub size: Option<i64>,
    pub web_url: Option<String>,
    pub created_date_time: Option<String>,
    pub last_modified_date_time: Option<String>,
    pub e_tag: Option<String>,
    pub parent_reference: Option<ItemReference>,
    pub file: Option<FileInfo>,
    pub folder: Option<FolderInfo>,
    pub root: Option<serde_json::Value>,
    #[serde(rename = "@microsoft.graph.downloadUrl")]
    pub download_url: Option<String>,
}

impl DriveItem {
    pub fn is_folder(&self) -> bool {
        self.folder.is_some() || self.root.is_some()
    }
}

/// Reference to a parent item / location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drive_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// File-specific metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub mime_type: Option<String>,
}

/// Folder-specific metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderInfo {
    pub child_count: Option<i64>,
}

// ═══════════════════════════════════════════════════════════════════════
//  Upload Sessions (resumable uploads)
// ═══════════════════════════════════════════════════════════════════════

/// Server-created upload session for resumable large file uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    pub upload_url: String,
    pub expiration_date_time: Option<String>,
    pub next_expected_ranges: Option<Vec<String>>,
}

/// Conflict behaviour on upload / copy / folder creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictBehavior {
    Fail,
    Replace,
    Rename,
}

impl From<ConflictPolicy> for ConflictBehavior {
    fn from(policy: ConflictPolicy) -> Self {
        match policy {
            ConflictPolicy::Fail => Self::Fail,
            ConflictPolicy::Replace => Self::Replace,
            ConflictPolicy::Rename => Self::Rename,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Copy / Move helpers
// ═══════════════════════════════════════════════════════════════════════

/// Request body for copy operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyRequest {
    pub parent_reference: ItemReference,
    pub name: Option<String>,
}

/// Request body for move / rename operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub parent_reference: Option<ItemReference>,
    pub name: Option<String>,
}

/// Body of a copy monitor URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncOperationStatus {
    /// `notStarted`, `inProgress`, `completed`, `updating`, `failed`,
    /// `deletePending`, `deleteFailed`, `waiting`.
    pub status: String,
    pub percentage_complete: Option<f64>,
    pub resource_id: Option<String>,
    pub error: Option<serde_json::Value>,
}

// ═══════════════════════════════════════════════════════════════════════
//  Permissions & Invitations
// ═══════════════════════════════════════════════════════════════════════

/// A permission on a drive item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub granted_to: Option<IdentitySet>,
    pub invitation: Option<SharingInvitation>,
}

/// A set of identities (user, application, device).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentitySet {
    pub application: Option<Identity>,
    pub user: Option<Identity>,
}

/// A single identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

/// Sharing invitation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharingInvitation {
    pub email: Option<String>,
    pub sign_in_required: Option<bool>,
}

/// Invite recipients request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    pub recipients: Vec<DriveRecipient>,
    pub roles: Vec<String>,
    pub require_sign_in: bool,
    pub send_invitation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A recipient for a sharing invite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveRecipient {
    pub email: String,
}

// ═══════════════════════════════════════════════════════════════════════
//  Pagination (Graph OData)
// ═══════════════════════════════════════════════════════════════════════

/// Generic paginated response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
