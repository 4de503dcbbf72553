use thiserror::Error;

use super::models::Config;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.base_url must start with http:// or https://: {0}")]
    InvalidBaseUrl(String),

    #[error("engine.log_tail_limit must be between 1 and 500: {0}")]
    InvalidLogTailLimit(usize),

    #[error("{0} must not exceed {1}")]
    BackoffOrdering(&'static str, &'static str),
}

pub fn validate(config: &Config) -> Result<(), ValidationError> {
    let base_url = config.server.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ValidationError::InvalidBaseUrl(base_url.to_string()));
    }

    if !(1..=500).contains(&config.engine.log_tail_limit) {
        return Err(ValidationError::InvalidLogTailLimit(
            config.engine.log_tail_limit,
        ));
    }

    if config.stream.reconnect_initial > config.stream.reconnect_max {
        return Err(ValidationError::BackoffOrdering(
            "stream.reconnect_initial",
            "stream.reconnect_max",
        ));
    }
    if config.resync.backoff_base > config.resync.backoff_max {
        return Err(ValidationError::BackoffOrdering(
            "resync.backoff_base",
            "resync.backoff_max",
        ));
    }

    Ok(())
}
