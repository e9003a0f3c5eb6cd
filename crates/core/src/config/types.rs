use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::engine::EngineConfig;
use crate::scheduler::SchedulerConfig;
use crate::storage::StorageConfig;

/// Root configuration. Every section has sensible defaults, so an empty
/// file yields a working configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.scheduler.workers, 2);
        assert_eq!(config.storage.retention_hours, 24);
    }

    #[test]
    fn test_config_round_trips() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.engine.timeout_secs, config.engine.timeout_secs);
    }
}
