use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "OPSWATCH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/opswatch.toml";
const ENV_PREFIX: &str = "OPSWATCH";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    // Load .env file if it exists (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    load_from_sources(config_path)
}

/// Load configuration from a specific path and environment
/// Useful for testing with custom config files
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // OPSWATCH__SERVER__BASE_URL -> server.base_url
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.base_url, "http://127.0.0.1:8080");
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[server]
base_url = "http://ops.internal:9000"
request_timeout = "45s"

[engine]
range = "7d"
log_tail_limit = 100
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.base_url, "http://ops.internal:9000");
        assert_eq!(
            config.server.request_timeout.as_duration(),
            std::time::Duration::from_secs(45)
        );
        assert_eq!(config.engine.range, crate::proto::Range::D7);
        assert_eq!(config.engine.log_tail_limit, 100);
        // untouched sections keep their defaults
        assert_eq!(
            config.resync.backoff_decay.as_duration(),
            std::time::Duration::from_secs(60)
        );
    }

    #[test]
    fn test_humanized_durations_in_all_sections() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[stream]
reconnect_initial = "250ms"
reconnect_max = "1m"

[resync]
backoff_base = "1s"
backoff_max = "2m"
backoff_decay = "5m"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(
            config.stream.reconnect_initial.as_duration(),
            std::time::Duration::from_millis(250)
        );
        assert_eq!(
            config.stream.reconnect_max.as_duration(),
            std::time::Duration::from_secs(60)
        );
        assert_eq!(
            config.resync.backoff_max.as_duration(),
            std::time::Duration::from_secs(120)
        );
    }
}
