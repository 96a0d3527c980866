//! Configuration for the realtime speech engine

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::SpeechError;

/// Configuration for the OpenAI Realtime connection and session
#[derive(Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// WebSocket endpoint, without query string
    #[serde(default = "default_url")]
    pub url: String,

    /// Realtime model, sent as the `model` query parameter
    #[serde(default = "default_model")]
    pub model: String,

    /// OpenAI API key (sensitive - uses SecretString)
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// Voice used for generated speech
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Encoding of caller audio sent to the engine
    #[serde(default = "default_audio_format")]
    pub input_audio_format: String,

    /// Encoding of generated audio; must match what the telephony side plays
    #[serde(default = "default_audio_format")]
    pub output_audio_format: String,

    /// Turn detection mode
    #[serde(default = "default_turn_detection")]
    pub turn_detection: String,

    /// System instructions for the assistant
    #[serde(default = "default_instructions")]
    pub instructions: String,

    /// Output modalities
    #[serde(default = "default_modalities")]
    pub modalities: Vec<String>,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Delay between the handshake and the session update, in milliseconds
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Handshake timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Have the assistant speak first
    #[serde(default)]
    pub greet_first: bool,

    /// Prompt sent as the caller's first message when `greet_first` is set
    #[serde(default = "default_greeting_prompt")]
    pub greeting_prompt: String,

    /// Server event types logged on receipt
    #[serde(default = "default_log_event_types")]
    pub log_event_types: Vec<String>,
}

impl std::fmt::Debug for RealtimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeConfig")
            .field("url", &self.url)
            .field("model", &self.model)
            .field(
                "api_key",
                &if self.api_key.is_some() {
                    Some("[REDACTED]")
                } else {
                    None
                },
            )
            .field("voice", &self.voice)
            .field("input_audio_format", &self.input_audio_format)
            .field("output_audio_format", &self.output_audio_format)
            .field("turn_detection", &self.turn_detection)
            .field("instructions", &format!("[{} chars]", self.instructions.len()))
            .field("modalities", &self.modalities)
            .field("temperature", &self.temperature)
            .field("settle_delay_ms", &self.settle_delay_ms)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("greet_first", &self.greet_first)
            .field("log_event_types", &self.log_event_types)
            .finish_non_exhaustive()
    }
}

fn default_url() -> String {
    "wss://api.openai.com/v1/realtime".to_string()
}

fn default_model() -> String {
    "gpt-4o-realtime-preview-2024-10-01".to_string()
}

fn default_voice() -> String {
    "shimmer".to_string()
}

fn default_audio_format() -> String {
    "g711_ulaw".to_string()
}

fn default_turn_detection() -> String {
    "server_vad".to_string()
}

fn default_instructions() -> String {
    "You are a helpful and friendly AI voice assistant. Your voice and personality \
     should be warm and engaging. Keep your answers short; you are talking to a \
     caller over the phone."
        .to_string()
}

fn default_modalities() -> Vec<String> {
    vec!["text".to_string(), "audio".to_string()]
}

const fn default_temperature() -> f32 {
    0.8
}

const fn default_settle_delay_ms() -> u64 {
    100
}

const fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_greeting_prompt() -> String {
    "Greet the user with \"Hello there! I am an AI voice assistant. \
     How can I help you?\""
        .to_string()
}

fn default_log_event_types() -> Vec<String> {
    [
        "error",
        "response.content.done",
        "rate_limits.updated",
        "response.done",
        "input_audio_buffer.committed",
        "input_audio_buffer.speech_stopped",
        "input_audio_buffer.speech_started",
        "session.created",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            model: default_model(),
            api_key: None,
            voice: default_voice(),
            input_audio_format: default_audio_format(),
            output_audio_format: default_audio_format(),
            turn_detection: default_turn_detection(),
            instructions: default_instructions(),
            modalities: default_modalities(),
            temperature: default_temperature(),
            settle_delay_ms: default_settle_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            greet_first: false,
            greeting_prompt: default_greeting_prompt(),
            log_event_types: default_log_event_types(),
        }
    }
}

impl RealtimeConfig {
    /// Create a minimal config for testing
    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            api_key: Some(SecretString::from("test-key")),
            ..Default::default()
        }
    }

    /// Full endpoint including the model query parameter
    pub fn endpoint(&self) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{separator}model={}", self.url, self.model)
    }

    /// The API key, if one is configured and non-blank
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_ref()
            .map(ExposeSecret::expose_secret)
            .filter(|key| !key.trim().is_empty())
    }

    /// Settle delay as a duration
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Handshake timeout as a duration
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Whether events of this type are logged on receipt
    pub fn should_log(&self, event_type: &str) -> bool {
        self.log_event_types.iter().any(|t| t == event_type)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Configuration` if the configuration is invalid.
    pub fn validate(&self) -> Result<(), SpeechError> {
        if self.api_key().is_none() {
            return Err(SpeechError::Configuration(
                "OpenAI API key is required".to_string(),
            ));
        }

        if !self.url.starts_with("ws://") && !self.url.starts_with("wss://") {
            return Err(SpeechError::Configuration(format!(
                "Realtime URL must use ws:// or wss://, got {}",
                self.url
            )));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(SpeechError::Configuration(format!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }

        if self.connect_timeout_ms == 0 {
            return Err(SpeechError::Configuration(
                "Connect timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = RealtimeConfig::default();

        assert_eq!(config.url, "wss://api.openai.com/v1/realtime");
        assert_eq!(config.voice, "shimmer");
        assert_eq!(config.input_audio_format, "g711_ulaw");
        assert_eq!(config.output_audio_format, "g711_ulaw");
        assert_eq!(config.turn_detection, "server_vad");
        assert_eq!(config.modalities, vec!["text", "audio"]);
        assert!((config.temperature - 0.8).abs() < f32::EPSILON);
        assert_eq!(config.settle_delay(), Duration::from_millis(100));
        assert!(!config.greet_first);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn endpoint_appends_model() {
        let config = RealtimeConfig::default();
        assert_eq!(
            config.endpoint(),
            "wss://api.openai.com/v1/realtime?model=gpt-4o-realtime-preview-2024-10-01"
        );

        let config = RealtimeConfig {
            url: "ws://localhost:9000/rt?debug=1".to_string(),
            model: "m".to_string(),
            ..Default::default()
        };
        assert_eq!(config.endpoint(), "ws://localhost:9000/rt?debug=1&model=m");
    }

    #[test]
    fn default_log_allow_list() {
        let config = RealtimeConfig::default();
        assert!(config.should_log("session.created"));
        assert!(config.should_log("input_audio_buffer.speech_started"));
        assert!(!config.should_log("response.audio.delta"));
    }

    #[test]
    fn validate_requires_api_key() {
        let config = RealtimeConfig::default();
        assert!(matches!(
            config.validate(),
            Err(SpeechError::Configuration(_))
        ));

        let blank = RealtimeConfig {
            api_key: Some(SecretString::from("   ")),
            ..Default::default()
        };
        assert!(blank.validate().is_err());

        assert!(RealtimeConfig::test().validate().is_ok());
    }

    #[test]
    fn validate_rejects_http_url() {
        let config = RealtimeConfig {
            url: "https://api.openai.com/v1/realtime".to_string(),
            ..RealtimeConfig::test()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_temperature_out_of_range() {
        let config = RealtimeConfig {
            temperature: 3.5,
            ..RealtimeConfig::test()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let debug = format!("{:?}", RealtimeConfig::test());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("test-key"));
    }

    #[test]
    fn deserializes_from_toml_with_defaults() {
        let toml_str = r#"
            api_key = "sk-test"
            voice = "alloy"
            greet_first = true
        "#;

        let config: RealtimeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_key(), Some("sk-test"));
        assert_eq!(config.voice, "alloy");
        assert!(config.greet_first);
        assert_eq!(config.turn_detection, "server_vad");
        assert_eq!(config.log_event_types.len(), 8);
    }
}
