//! Mock file resolver for tests.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::resolver::{FileResolver, MediaFile, ResolverError};

/// An in-memory resolver mapping file ids straight to paths.
pub struct MockResolver {
    files: Mutex<BTreeMap<String, PathBuf>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(BTreeMap::new()),
        }
    }

    /// Registers a file id.
    pub fn add(&self, file_id: impl Into<String>, path: impl Into<PathBuf>) {
        self.files.lock().unwrap().insert(file_id.into(), path.into());
    }
}

impl Default for MockResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileResolver for MockResolver {
    async fn resolve(&self, file_id: &str) -> Result<PathBuf, ResolverError> {
        self.files
            .lock()
            .unwrap()
            .get(file_id)
            .cloned()
            .ok_or_else(|| ResolverError::NotFound {
                file_id: file_id.to_string(),
            })
    }

    async fn list(&self) -> Result<Vec<MediaFile>, ResolverError> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .map(|(id, path)| MediaFile {
                name: id.clone(),
                path: path.clone(),
                size_bytes: 0,
            })
            .collect())
    }

    async fn remove(&self, file_id: &str) -> Result<u64, ResolverError> {
        match self.files.lock().unwrap().remove(file_id) {
            Some(_) => Ok(1),
            None => Ok(0),
        }
    }
}
