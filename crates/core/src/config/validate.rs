use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Scheduler has at least one worker
/// - Retention and timeout windows are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.scheduler.workers == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.workers must be at least 1".to_string(),
        ));
    }

    if config.storage.retention_hours == 0 {
        return Err(ConfigError::ValidationError(
            "storage.retention_hours must be at least 1".to_string(),
        ));
    }

    if config.engine.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "engine.timeout_secs must be at least 1".to_string(),
        ));
    }

    Ok(())
}
