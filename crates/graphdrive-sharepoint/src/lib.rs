//! # graphdrive-sharepoint: SharePoint document libraries over Microsoft Graph
//!
//! A [`graphdrive_fs::FilesystemAdapter`] that stores files in SharePoint
//! Online document libraries. Built against **Microsoft Graph
//! v1.0**.
//!
//! ## Capabilities
//!
//! - **App-only authentication** – client-credentials grant against the
//!   Microsoft identity platform v2.0 with a cached, self-refreshing token.
//! - **Files & Folders** – path-addressed read, write, update, rename, copy,
//!   delete, folder creation, and (recursive) listing.
//! - **Uploads** – simple PUT for files ≤ 4 MiB and resumable upload
//!   sessions in 320 KiB-aligned chunks for anything larger, including
//!   streams spooled through a temp file.
//! - **Drives** – enumerate, create, and delete a site's document
//!   libraries; address a library by binding it or by the first path
//!   segment.
//! - **Sharing** – invite users by e-mail with write access.
//! - **Resilience** – retries with exponential back-off on throttling and
//!   transient server errors, honouring `Retry-After`.

pub mod types;
pub mod error;
pub mod auth;
pub mod api_client;
pub mod paths;
pub mod drives;
pub mod files;
pub mod sharing;
pub mod metadata;
pub mod adapter;

// Re-exports
pub use adapter::SharepointAdapter;
pub use error::{GraphError, GraphErrorCode, GraphResult};
pub use types::SharepointConfig;
