use serde::{Deserialize, Serialize};

use crate::humanize::DurationStr;
use crate::proto::Range;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub stream: StreamSettings,
    #[serde(default)]
    pub resync: ResyncSettings,
}

/// Remote ops server
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: DurationStr,
    /// Applies to snapshot requests only; the event stream stays open.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: DurationStr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_connect_timeout() -> DurationStr {
    DurationStr::from_millis(10_000)
}

fn default_request_timeout() -> DurationStr {
    DurationStr::from_millis(30_000)
}

/// Reconciliation settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub range: Range,
    #[serde(default = "default_log_tail_limit")]
    pub log_tail_limit: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            range: Range::default(),
            log_tail_limit: default_log_tail_limit(),
        }
    }
}

fn default_log_tail_limit() -> usize {
    200
}

/// Transport reconnect behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamSettings {
    #[serde(default = "default_reconnect_initial")]
    pub reconnect_initial: DurationStr,
    #[serde(default = "default_reconnect_max")]
    pub reconnect_max: DurationStr,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            reconnect_initial: default_reconnect_initial(),
            reconnect_max: default_reconnect_max(),
        }
    }
}

fn default_reconnect_initial() -> DurationStr {
    DurationStr::from_millis(500)
}

fn default_reconnect_max() -> DurationStr {
    DurationStr::from_millis(30_000)
}

/// Backoff between resync cycles when the server keeps issuing resets
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResyncSettings {
    #[serde(default = "default_backoff_base")]
    pub backoff_base: DurationStr,
    #[serde(default = "default_backoff_max")]
    pub backoff_max: DurationStr,
    #[serde(default = "default_backoff_decay")]
    pub backoff_decay: DurationStr,
}

impl Default for ResyncSettings {
    fn default() -> Self {
        Self {
            backoff_base: default_backoff_base(),
            backoff_max: default_backoff_max(),
            backoff_decay: default_backoff_decay(),
        }
    }
}

fn default_backoff_base() -> DurationStr {
    DurationStr::from_millis(500)
}

fn default_backoff_max() -> DurationStr {
    DurationStr::from_millis(30_000)
}

fn default_backoff_decay() -> DurationStr {
    DurationStr::from_millis(60_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.engine.range, Range::H24);
        assert_eq!(config.engine.log_tail_limit, 200);
        assert_eq!(
            config.stream.reconnect_initial.as_duration(),
            std::time::Duration::from_millis(500)
        );
    }

    #[test]
    fn test_deserialize_from_toml() {
        let config: Config = toml::from_str(
            r#"
[server]
base_url = "http://ops.internal:9000"

[engine]
range = "7d"

[stream]
reconnect_initial = "250ms"
        "#,
        )
        .unwrap();

        assert_eq!(config.server.base_url, "http://ops.internal:9000");
        assert_eq!(config.engine.range, Range::D7);
        assert_eq!(
            config.stream.reconnect_initial.as_duration(),
            std::time::Duration::from_millis(250)
        );
        // unspecified sections fall back to defaults
        assert_eq!(config.engine.log_tail_limit, 200);
    }
}
