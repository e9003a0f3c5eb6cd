//! Filesystem-backed file resolver.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{FileResolver, MediaFile, ResolverError};

/// Resolves file ids against a single upload directory.
pub struct FsResolver {
    upload_dir: PathBuf,
}

impl FsResolver {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Ids are plain name prefixes; anything that could escape the upload
    /// directory is rejected outright.
    fn validate_id(file_id: &str) -> Result<(), ResolverError> {
        if file_id.is_empty()
            || file_id.contains('/')
            || file_id.contains('\\')
            || file_id.contains("..")
        {
            return Err(ResolverError::InvalidId {
                file_id: file_id.to_string(),
            });
        }
        Ok(())
    }

    async fn read_entries(&self) -> Result<Vec<(String, PathBuf, u64)>, ResolverError> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.upload_dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            entries.push((name, entry.path(), meta.len()));
        }
        // Sort by name so prefix matches pick the same file every time
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

#[async_trait]
impl FileResolver for FsResolver {
    async fn resolve(&self, file_id: &str) -> Result<PathBuf, ResolverError> {
        Self::validate_id(file_id)?;

        let entries = self.read_entries().await?;
        let matched = entries
            .iter()
            .find(|(name, _, _)| name.starts_with(file_id));

        match matched {
            Some((name, path, _)) => {
                debug!(file_id, file = %name, "resolved source file");
                Ok(path.clone())
            }
            None => Err(ResolverError::NotFound {
                file_id: file_id.to_string(),
            }),
        }
    }

    async fn list(&self) -> Result<Vec<MediaFile>, ResolverError> {
        let entries = self.read_entries().await?;
        Ok(entries
            .into_iter()
            .map(|(name, path, size_bytes)| MediaFile {
                name,
                path,
                size_bytes,
            })
            .collect())
    }

    async fn remove(&self, file_id: &str) -> Result<u64, ResolverError> {
        Self::validate_id(file_id)?;

        let mut removed = 0;
        for (name, path, _) in self.read_entries().await? {
            if name.starts_with(file_id) {
                tokio::fs::remove_file(&path).await?;
                debug!(file_id, file = %name, "removed stored file");
                removed += 1;
            }
        }
        Ok(removed)
    }
}
