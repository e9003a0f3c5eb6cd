//! Conversion pipeline.
//!
//! Ties request validation, file resolution, the engine and the
//! scheduler together behind a single facade. Synchronous requests run
//! inline; queued requests are validated, persisted and dispatched to
//! the worker pool.

mod error;
mod orchestrator;
mod worker;

pub use error::PipelineError;
pub use orchestrator::ConversionPipeline;
pub use worker::ConversionWorker;
