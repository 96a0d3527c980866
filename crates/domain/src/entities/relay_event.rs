//! Events flowing into a call session from its two adapters

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value_objects::{MarkName, StreamId, UtteranceId};

/// Event received from the telephony transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelephonyEvent {
    /// A media stream started; everything before belongs to no stream
    Start {
        /// Identifier required to address outbound frames
        stream_id: StreamId,
        /// Telephony call identifier, for logging only
        call_sid: Option<String>,
    },
    /// One inbound audio frame
    Media {
        /// Position on the telephony clock, in milliseconds
        timestamp_ms: u64,
        /// Encoded audio, forwarded to the speech engine unmodified
        payload: String,
    },
    /// The caller's device finished playing up to a previously sent mark
    Mark {
        /// Name echoed back by the telephony side
        name: MarkName,
    },
    /// Any other event kind (`connected`, `stop`, `dtmf`, ...)
    Other {
        /// Event kind as named on the wire
        kind: String,
    },
}

impl TelephonyEvent {
    /// Wire name of the event kind
    pub fn kind(&self) -> &str {
        match self {
            Self::Start { .. } => "start",
            Self::Media { .. } => "media",
            Self::Mark { .. } => "mark",
            Self::Other { kind } => kind,
        }
    }
}

/// Structured error detail reported by the speech engine
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineErrorDetail {
    /// Error category (e.g. "invalid_request_error")
    pub kind: Option<String>,
    /// Machine readable code
    pub code: Option<String>,
    /// Human readable message
    pub message: String,
}

impl fmt::Display for EngineErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.code) {
            (Some(kind), Some(code)) => write!(f, "{kind}/{code}: {}", self.message),
            (Some(tag), None) | (None, Some(tag)) => write!(f, "{tag}: {}", self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

/// Final status of one generated response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Generation finished normally
    Completed,
    /// Generation was cancelled (e.g. by a barge-in)
    Cancelled,
    /// Generation stopped early (token limit, content filter)
    Incomplete,
    /// Generation failed; carries the engine's detail when it sent one
    Failed(Option<EngineErrorDetail>),
}

impl ResponseOutcome {
    /// Whether the response failed
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Event surfaced by the speech engine adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEngineEvent {
    /// The engine connection is open and the session has been configured
    Connected,
    /// One chunk of generated speech
    AudioDelta {
        /// Utterance the chunk belongs to
        utterance_id: UtteranceId,
        /// Encoded audio, forwarded to the telephony side unmodified
        payload: String,
    },
    /// The engine's voice-activity detection heard the caller start talking
    SpeechStarted,
    /// The engine's voice-activity detection heard the caller stop talking
    SpeechStopped,
    /// A response finished
    ResponseDone(ResponseOutcome),
    /// The engine reported an error outside of a response
    Error(EngineErrorDetail),
    /// The engine connection is gone (terminal)
    Closed {
        /// Why the connection ended
        reason: String,
    },
}

impl SpeechEngineEvent {
    /// Short name used in logs
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::AudioDelta { .. } => "audio_delta",
            Self::SpeechStarted => "speech_started",
            Self::SpeechStopped => "speech_stopped",
            Self::ResponseDone(_) => "response_done",
            Self::Error(_) => "error",
            Self::Closed { .. } => "closed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telephony_kind_names_match_wire() {
        let start = TelephonyEvent::Start {
            stream_id: StreamId::new("MZ1").unwrap(),
            call_sid: None,
        };
        assert_eq!(start.kind(), "start");
        let other = TelephonyEvent::Other {
            kind: "dtmf".to_string(),
        };
        assert_eq!(other.kind(), "dtmf");
    }

    #[test]
    fn error_detail_display() {
        let detail = EngineErrorDetail {
            kind: Some("invalid_request_error".to_string()),
            code: Some("bad_audio".to_string()),
            message: "audio too short".to_string(),
        };
        assert_eq!(
            detail.to_string(),
            "invalid_request_error/bad_audio: audio too short"
        );

        let bare = EngineErrorDetail {
            message: "boom".to_string(),
            ..Default::default()
        };
        assert_eq!(bare.to_string(), "boom");
    }

    #[test]
    fn failed_outcome_is_failure() {
        assert!(ResponseOutcome::Failed(None).is_failure());
        assert!(!ResponseOutcome::Completed.is_failure());
    }
}
