//! Application configuration
//!
//! Split into focused sub-modules:
//! - `server`: HTTP server settings
//! - `telephony`: call setup document and media stream endpoint
//!
//! The speech engine, relay and telemetry sections reuse the configuration
//! types of the crates that consume them.
//!
//! Sources, lowest precedence first: built-in defaults, an optional
//! `config.toml`, `VOICEBRIDGE_*` environment variables (nested keys joined
//! with `__`, e.g. `VOICEBRIDGE_SPEECH_ENGINE__VOICE`), and finally the
//! plain `PORT` and `OPENAI_API_KEY` variables.

mod server;
mod telephony;

use ai_speech::RealtimeConfig;
use application::RelayConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use server::ServerConfig;
pub use telephony::TelephonyConfig;

use crate::telemetry::TelemetryConfig;

/// Environment variable prefix for nested configuration keys
const ENV_PREFIX: &str = "VOICEBRIDGE";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Realtime speech engine configuration
    #[serde(default)]
    pub speech_engine: RealtimeConfig,

    /// Telephony configuration
    #[serde(default)]
    pub telephony: TelephonyConfig,

    /// Per-call relay configuration
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Configuration that loaded but cannot be used
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    /// Speech engine section is invalid (e.g. missing API key)
    #[error("speech_engine: {0}")]
    SpeechEngine(String),

    /// Any other invalid value
    #[error("{section}: {reason}")]
    Invalid {
        /// Configuration section
        section: &'static str,
        /// What is wrong
        reason: String,
    },
}

/// Unprefixed variables honoured for compatibility with common hosting setups
#[derive(Debug, Clone, Default)]
struct PlainEnv {
    port: Option<String>,
    openai_api_key: Option<String>,
}

impl PlainEnv {
    fn from_process() -> Self {
        Self {
            port: std::env::var("PORT").ok(),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and optional file
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(
            config::File::with_name("config").required(false),
            PlainEnv::from_process(),
        )
    }

    fn load_from<S>(file: S, plain_env: PlainEnv) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let builder = config::Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5050)?
            // Load from file if exists
            .add_source(file)
            // Override with environment variables (e.g., VOICEBRIDGE_SERVER__PORT)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("speech_engine.modalities")
                    .with_list_parse_key("speech_engine.log_event_types")
                    .try_parsing(true),
            )
            .set_override_option("server.port", plain_env.port)?
            .set_override_option("speech_engine.api_key", plain_env.openai_api_key)?;

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Check the configuration is usable
    ///
    /// A missing OpenAI API key is fatal: the process must not start.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.speech_engine
            .validate()
            .map_err(|e| ConfigValidationError::SpeechEngine(e.to_string()))?;

        if !self.telephony.stream_path.starts_with('/') {
            return Err(ConfigValidationError::Invalid {
                section: "telephony",
                reason: format!(
                    "stream_path must start with '/', got {:?}",
                    self.telephony.stream_path
                ),
            });
        }

        if self.relay.event_buffer == 0 {
            return Err(ConfigValidationError::Invalid {
                section: "relay",
                reason: "event_buffer must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}
