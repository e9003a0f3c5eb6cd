//! Configuration for the job scheduler.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the background job scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of concurrent workers draining the queue.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Path to the SQLite job database.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_workers() -> usize {
    2
}

fn default_db_path() -> PathBuf {
    PathBuf::from("remedia-jobs.db")
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            db_path: default_db_path(),
        }
    }
}
