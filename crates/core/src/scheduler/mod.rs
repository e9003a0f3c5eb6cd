//! Background job scheduling.
//!
//! The scheduler is an explicit, injected component: it owns a dispatch
//! channel and a worker pool, and leans on the [`JobStore`](crate::job::JobStore)
//! for durability. Callers construct one, hand it an executor at startup,
//! and enqueue requests through it.

mod config;
mod executor;
mod runner;

pub use config::SchedulerConfig;
pub use executor::{JobExecutor, ProgressSink};
pub use runner::Scheduler;

use thiserror::Error;

use crate::job::JobError;

/// Errors from the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("job queue unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Store(#[from] JobError),
}
