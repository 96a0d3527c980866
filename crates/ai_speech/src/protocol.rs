//! Realtime API wire events
//!
//! Only the events the relay produces or consumes are modelled. Everything
//! else the engine sends deserializes to [`ServerEvent::Other`].

use serde::{Deserialize, Serialize};

use crate::config::RealtimeConfig;
use crate::error::SpeechError;

/// Event sent to the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Configure the session
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session settings
        session: SessionSettings,
    },

    /// Append caller audio to the input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64 audio in the configured input format
        audio: String,
    },

    /// Add an item to the conversation
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        /// Item to add
        item: ConversationItem,
    },

    /// Ask the engine to generate a response
    #[serde(rename = "response.create")]
    ResponseCreate,

    /// Cut an assistant item at the point the caller stopped hearing it
    #[serde(rename = "conversation.item.truncate")]
    ConversationItemTruncate {
        /// Assistant item being truncated
        item_id: String,
        /// Content part index
        content_index: u32,
        /// Audio kept, in milliseconds
        audio_end_ms: u64,
    },
}

impl ClientEvent {
    /// Session update built from configuration
    pub fn session_update(config: &RealtimeConfig) -> Self {
        Self::SessionUpdate {
            session: SessionSettings {
                turn_detection: TurnDetection {
                    kind: config.turn_detection.clone(),
                },
                input_audio_format: config.input_audio_format.clone(),
                output_audio_format: config.output_audio_format.clone(),
                voice: config.voice.clone(),
                instructions: config.instructions.clone(),
                modalities: config.modalities.clone(),
                temperature: config.temperature,
            },
        }
    }

    /// A user text message asking the assistant to open the conversation
    pub fn greeting(prompt: impl Into<String>) -> Self {
        Self::ConversationItemCreate {
            item: ConversationItem {
                kind: "message".to_string(),
                role: "user".to_string(),
                content: vec![ContentPart {
                    kind: "input_text".to_string(),
                    text: prompt.into(),
                }],
            },
        }
    }

    /// Wire `type` of this event
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::SessionUpdate { .. } => "session.update",
            Self::InputAudioBufferAppend { .. } => "input_audio_buffer.append",
            Self::ConversationItemCreate { .. } => "conversation.item.create",
            Self::ResponseCreate => "response.create",
            Self::ConversationItemTruncate { .. } => "conversation.item.truncate",
        }
    }

    /// Serialize to the JSON text frame
    pub fn to_json(&self) -> Result<String, SpeechError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Session settings carried by `session.update`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSettings {
    /// Turn detection
    pub turn_detection: TurnDetection,
    /// Caller audio encoding
    pub input_audio_format: String,
    /// Generated audio encoding
    pub output_audio_format: String,
    /// Voice
    pub voice: String,
    /// System instructions
    pub instructions: String,
    /// Output modalities
    pub modalities: Vec<String>,
    /// Sampling temperature
    pub temperature: f32,
}

/// Turn detection mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnDetection {
    /// Mode name, e.g. `server_vad`
    #[serde(rename = "type")]
    pub kind: String,
}

/// Conversation item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationItem {
    /// Item type
    #[serde(rename = "type")]
    pub kind: String,
    /// Author role
    pub role: String,
    /// Content parts
    pub content: Vec<ContentPart>,
}

/// One content part of a conversation item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentPart {
    /// Part type
    #[serde(rename = "type")]
    pub kind: String,
    /// Text
    pub text: String,
}

/// Event received from the engine
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Session created after the handshake
    #[serde(rename = "session.created")]
    SessionCreated,

    /// Session settings applied
    #[serde(rename = "session.updated")]
    SessionUpdated,

    /// One chunk of generated audio
    #[serde(rename = "response.audio.delta")]
    ResponseAudioDelta {
        /// Assistant item the audio belongs to
        item_id: String,
        /// Base64 audio in the configured output format
        #[serde(default)]
        delta: String,
    },

    /// Voice activity detected in the caller audio
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted,

    /// Voice activity ended in the caller audio
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped,

    /// Caller audio committed to the conversation
    #[serde(rename = "input_audio_buffer.committed")]
    InputAudioBufferCommitted,

    /// Rate limit bookkeeping
    #[serde(rename = "rate_limits.updated")]
    RateLimitsUpdated,

    /// A response finished
    #[serde(rename = "response.done")]
    ResponseDone {
        /// Final response state
        response: ResponseBody,
    },

    /// Error outside of a response
    #[serde(rename = "error")]
    Error {
        /// Error detail
        error: ErrorBody,
    },

    /// Any other event type
    #[serde(other)]
    Other,
}

impl ServerEvent {
    /// Parse one JSON text frame
    pub fn parse(text: &str) -> Result<Self, SpeechError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Wire `type` of a raw frame, without parsing the rest
pub fn event_type(text: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct Envelope {
        #[serde(rename = "type")]
        kind: String,
    }

    serde_json::from_str::<Envelope>(text).ok().map(|e| e.kind)
}

/// Final state of a response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResponseBody {
    /// Completion status
    pub status: ResponseStatus,
    /// Why the response ended the way it did
    #[serde(default)]
    pub status_details: Option<StatusDetails>,
}

impl ResponseBody {
    /// Structured error of a failed response, if the engine sent one
    pub fn error(&self) -> Option<&ErrorBody> {
        self.status_details.as_ref()?.error.as_ref()
    }
}

/// Response completion status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// Finished normally
    Completed,
    /// Cancelled by the client or by a barge-in
    Cancelled,
    /// Stopped early
    Incomplete,
    /// Failed
    Failed,
    /// Still running, or a status this client does not know
    #[serde(other)]
    InProgress,
}

/// Status details of a response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusDetails {
    /// Error that caused a failure
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

/// Error detail sent by the engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    /// Error category
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Machine-readable code
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
}
