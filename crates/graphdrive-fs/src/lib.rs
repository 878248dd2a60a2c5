//! # graphdrive-fs: Generic filesystem abstraction
//!
//! A small, storage-agnostic filesystem layer. Backends implement
//! [`FilesystemAdapter`]; callers talk to the [`Filesystem`] facade, which
//! normalises paths, enforces existence checks, and fills in derived
//! metadata such as guessed MIME types.
//!
//! ## Capabilities
//!
//! - **Adapter trait** – write / update (bytes or streams), read (bytes or
//!   streams), rename, copy, delete, directories, listing, metadata.
//! - **Extensions** – optional traits for public URLs, drive management,
//!   and user invitations, surfaced on the facade only when the adapter
//!   implements them.
//! - **Paths** – `..` / `.` resolution, separator clean-up, root guarding.
//! - **In-memory adapter** – a complete reference backend for tests.

pub mod adapter;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod memory;
pub mod metadata;
pub mod path;

// Re-exports
pub use adapter::{
    DriveInfo, DriveManager, FilesystemAdapter, Invitation, ReadStream, UrlProvider, UserInviter,
};
pub use config::{Config, ConflictPolicy};
pub use error::{FsError, FsResult};
pub use filesystem::Filesystem;
pub use memory::MemoryAdapter;
pub use metadata::{EntryType, Metadata};
pub use path::normalize_path;
