//! Source file resolution.
//!
//! Uploaded files are stored under an id prefix (`<id>.<original-ext>`),
//! so clients address them by id alone and the resolver maps the id back
//! to a concrete path.

mod fs_resolver;

pub use fs_resolver::FsResolver;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from file resolution.
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("file not found: {file_id}")]
    NotFound { file_id: String },

    #[error("invalid file id: {file_id}")]
    InvalidId { file_id: String },

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// A stored media file visible to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFile {
    /// Filename on disk (id prefix plus original extension).
    pub name: String,
    /// Absolute or storage-relative path.
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Maps client-facing file ids to concrete filesystem paths.
#[async_trait]
pub trait FileResolver: Send + Sync {
    /// Resolves a file id to the path of the stored file.
    ///
    /// When multiple files share the prefix, resolution is deterministic:
    /// the same storage state always yields the same path.
    async fn resolve(&self, file_id: &str) -> Result<PathBuf, ResolverError>;

    /// Lists all stored media files.
    async fn list(&self) -> Result<Vec<MediaFile>, ResolverError>;

    /// Removes every stored file matching the id prefix and returns how
    /// many were deleted. Removing an unknown id deletes nothing.
    async fn remove(&self, file_id: &str) -> Result<u64, ResolverError>;
}
