//! Configuration management for opswatch
//!
//! This module provides a layered configuration system that loads settings
//! from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! Configuration can be overridden using environment variables with the
//! pattern `OPSWATCH__<section>__<key>`, e.g.
//! `OPSWATCH__SERVER__BASE_URL=http://ops.internal:9000` or
//! `OPSWATCH__ENGINE__RANGE=7d`.
//!
//! By default the configuration is loaded from `config/opswatch.toml`;
//! override the path with the `OPSWATCH_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{Config, EngineSettings, ResyncSettings, ServerConfig, StreamSettings};
pub use validation::ValidationError;

use thiserror::Error;

use crate::api::ClientConfig;
use crate::engine::{EngineConfig, ResetBackoffConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or
    /// validation fails (bad base URL, out-of-range limits, inverted
    /// backoff bounds).
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// HTTP client settings derived from this configuration.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            connect_timeout: self.server.connect_timeout.as_duration(),
            request_timeout: self.server.request_timeout.as_duration(),
            reconnect_initial: self.stream.reconnect_initial.as_duration(),
            reconnect_max: self.stream.reconnect_max.as_duration(),
        }
    }

    /// Engine settings derived from this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            range: self.engine.range,
            log_tail_cap: self.engine.log_tail_limit,
            resync: ResetBackoffConfig {
                base: self.resync.backoff_base.as_duration(),
                max: self.resync.backoff_max.as_duration(),
                decay: self.resync.backoff_decay.as_duration(),
            },
        }
    }
}
