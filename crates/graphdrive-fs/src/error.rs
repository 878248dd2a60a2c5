//! Error types shared by every filesystem adapter.

use thiserror::Error;

/// Convenience alias.
pub type FsResult<T> = Result<T, FsError>;

/// Errors surfaced through the filesystem facade and adapters.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("File not found at path: {0}")]
    FileNotFound(String),

    #[error("File already exists at path: {0}")]
    FileExists(String),

    #[error("Path is outside of the defined root, path: [{0}]")]
    OutsideRoot(String),

    #[error("Root directories can not be deleted")]
    RootViolation,

    #[error("Metadata field `{field}` is unavailable for {path}")]
    MetadataUnavailable { path: String, field: &'static str },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation not supported by this adapter: {0}")]
    Unsupported(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl FsError {
    /// Wrap an adapter-specific error.
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend(err.into())
    }

    /// Whether this error means "the path does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound(_))
    }
}
