//! Testing utilities and mock implementations.
//!
//! This module provides scriptable mocks for the pipeline's collaborator
//! traits, allowing end-to-end tests without ffmpeg or real uploads.
//!
//! # Example
//!
//! ```rust,ignore
//! use remedia_core::testing::{MockEngine, MockResolver};
//!
//! let engine = MockEngine::new();
//! let resolver = MockResolver::new();
//!
//! // Configure mock behavior
//! resolver.add("abc123", "/uploads/abc123.mkv");
//! engine.set_progress_script(vec![25, 50, 100]);
//!
//! // Use in a ConversionWorker...
//! ```

mod mock_engine;
mod mock_resolver;

pub use mock_engine::{MockEngine, RecordedExecution};
pub use mock_resolver::MockResolver;
