//! Core library for the Remedia media conversion server.
//!
//! The flow of a conversion request:
//!
//! 1. [`normalizer`] turns the raw request into engine-ready parameters,
//!    repairing what it can and rejecting what it cannot.
//! 2. [`resolver`] maps the client's file id to a stored source file.
//! 3. [`engine`] does the actual transcoding (ffmpeg) with progress
//!    reporting and partial-output cleanup.
//! 4. [`pipeline`] ties it together: synchronous conversions run inline,
//!    queued ones go through the [`scheduler`] backed by a durable
//!    [`job`] store.

pub mod config;
pub mod engine;
pub mod job;
pub mod metrics;
pub mod normalizer;
pub mod pipeline;
pub mod resolver;
pub mod scheduler;
pub mod storage;
pub mod testing;

pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use engine::{EngineConfig, EngineError, FfmpegEngine, TranscodeEngine};
pub use job::{ConversionOutcome, JobError, JobRecord, JobState, JobStore, SqliteJobStore};
pub use normalizer::{normalize, ContainerFormat, ConversionRequest, NormalizedParams};
pub use pipeline::{ConversionPipeline, ConversionWorker, PipelineError};
pub use resolver::{FileResolver, FsResolver, MediaFile};
pub use scheduler::{JobExecutor, ProgressSink, Scheduler, SchedulerConfig, SchedulerError};
pub use storage::StorageConfig;
