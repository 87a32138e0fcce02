//! API server configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use swing_analysis::PipelineConfig;
use swing_feedback::FeedbackConfig;
use swing_stream::ManagerConfig;

/// Complete server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// HTTP server configuration
    pub http: HttpConfig,

    /// Batch pipeline: validator, classifier and severity tuning
    pub pipeline: PipelineConfig,

    /// Streaming sessions
    pub sessions: ManagerConfig,

    /// Coaching feedback
    pub feedback: FeedbackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub bind_addr: SocketAddr,

    /// Request timeout (seconds)
    pub timeout_secs: u64,

    /// Maximum request body size (bytes)
    pub max_body_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            timeout_secs: 30,
            max_body_size: 8 * 1024 * 1024, // 8MB, ~1000 frames of JSON
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            pipeline: PipelineConfig::default(),
            sessions: ManagerConfig::default(),
            feedback: FeedbackConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Load configuration from file
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(Self::environment())
            .build()?;

        settings.try_deserialize()
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(Self::environment())
            .build()?;

        settings.try_deserialize()
    }

    /// `SWING_SESSIONS__IDLE_TIMEOUT_MS=2000` style overrides
    fn environment() -> config::Environment {
        config::Environment::with_prefix("SWING")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Session manager settings sharing the pipeline's validator and club
    /// policy
    pub fn session_manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            validator: self.pipeline.validator.clone(),
            strict_club: self.pipeline.strict_club,
            ..self.sessions.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.http.bind_addr.port(), 8080);
        assert_eq!(config.sessions.session.stride, 5);
        assert_eq!(config.feedback.top_n, 3);
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("swing-api-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            r#"
[http]
bind_addr = "127.0.0.1:9000"

[pipeline]
strict_club = true

[sessions]
idle_timeout_ms = 100

[sessions.session]
stride = 3
"#,
        )
        .unwrap();

        let config = ApiConfig::from_file(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.http.bind_addr.port(), 9000);
        assert_eq!(config.sessions.idle_timeout_ms, 100);
        assert_eq!(config.sessions.session.stride, 3);
        assert_eq!(config.sessions.session.buffer_capacity, 150);
        assert!(config.session_manager_config().strict_club);
    }
}
