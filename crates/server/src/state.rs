use std::sync::Arc;

use remedia_core::{Config, ConversionPipeline, FileResolver, TranscodeEngine};

/// Shared application state
pub struct AppState {
    config: Config,
    pipeline: Arc<ConversionPipeline>,
    resolver: Arc<dyn FileResolver>,
    engine: Arc<dyn TranscodeEngine>,
}

impl AppState {
    pub fn new(
        config: Config,
        pipeline: Arc<ConversionPipeline>,
        resolver: Arc<dyn FileResolver>,
        engine: Arc<dyn TranscodeEngine>,
    ) -> Self {
        Self {
            config,
            pipeline,
            resolver,
            engine,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pipeline(&self) -> &ConversionPipeline {
        &self.pipeline
    }

    pub fn resolver(&self) -> &dyn FileResolver {
        self.resolver.as_ref()
    }

    pub fn engine(&self) -> &dyn TranscodeEngine {
        self.engine.as_ref()
    }
}
