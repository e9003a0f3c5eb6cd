//! Durable conversion job records.
//!
//! A job survives process restarts: its request, state, progress and
//! outcome live in the store, and interrupted jobs are re-queued at
//! startup. Terminal records are immutable.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteJobStore;
pub use store::JobStore;
pub use types::{ConversionOutcome, JobError, JobRecord, JobState};
