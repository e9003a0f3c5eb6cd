//! Storage layout and output retention.
//!
//! Output artifacts are disposable: clients are expected to download them
//! promptly, and a periodic sweep removes anything older than the
//! configured retention window.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metrics::FILES_SWEPT;

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding uploaded source files.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Directory conversion outputs are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Output files older than this are deleted by the sweep.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,

    /// Interval between cleanup sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploads")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_retention_hours() -> u64 {
    24
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            output_dir: default_output_dir(),
            retention_hours: default_retention_hours(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl StorageConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours * 3600)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Creates the upload and output directories if they do not exist.
pub async fn ensure_layout(config: &StorageConfig) -> std::io::Result<()> {
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    tokio::fs::create_dir_all(&config.output_dir).await?;
    debug!(
        upload_dir = %config.upload_dir.display(),
        output_dir = %config.output_dir.display(),
        "storage layout ready"
    );
    Ok(())
}

/// Deletes files in `dir` whose modification time is older than
/// `max_age`. Returns the number of files removed. Subdirectories are
/// left alone.
pub async fn sweep_expired(dir: &Path, max_age: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let meta = match entry.metadata().await {
            Ok(meta) => meta,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "could not stat file");
                continue;
            }
        };
        if !meta.is_file() {
            continue;
        }

        let expired = meta
            .modified()
            .ok()
            .and_then(|mtime| now.duration_since(mtime).ok())
            .is_some_and(|age| age > max_age);

        if expired {
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => {
                    FILES_SWEPT.inc();
                    removed += 1;
                    debug!(path = %entry.path().display(), "removed expired output");
                }
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "could not remove expired output")
                }
            }
        }
    }

    if removed > 0 {
        info!(removed, dir = %dir.display(), "cleanup sweep finished");
    }
    Ok(removed)
}

/// Runs [`sweep_expired`] forever at the configured interval. Meant to be
/// spawned as a background task; errors are logged, not fatal.
pub async fn run_sweeper(config: StorageConfig) {
    let mut ticker = tokio::time::interval(config.sweep_interval());
    // First tick fires immediately; skip it so startup is not a sweep
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if let Err(e) = sweep_expired(&config.output_dir, config.retention()).await {
            warn!(error = %e, "cleanup sweep failed");
        }
    }
}
