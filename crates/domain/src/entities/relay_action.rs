//! Actions a call session asks its adapters to perform

use crate::value_objects::{MarkName, StreamId, UtteranceId};

/// Outbound frame for the telephony transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelephonyCommand {
    /// Play a chunk of audio on the caller's line
    Media {
        /// Target stream
        stream_id: StreamId,
        /// Encoded audio
        payload: String,
    },
    /// Ask to be told when playback reaches this point
    Mark {
        /// Target stream
        stream_id: StreamId,
        /// Token echoed back on acknowledgment
        name: MarkName,
    },
    /// Drop all queued, not yet played audio
    Clear {
        /// Target stream
        stream_id: StreamId,
    },
}

impl TelephonyCommand {
    /// Wire name of the command
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Media { .. } => "media",
            Self::Mark { .. } => "mark",
            Self::Clear { .. } => "clear",
        }
    }
}

/// Command for the speech engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEngineCommand {
    /// Append caller audio to the engine's input buffer
    AppendAudio {
        /// Encoded audio exactly as received from the telephony side
        payload: String,
    },
    /// Forget the part of an utterance the caller never heard
    Truncate {
        /// Utterance to cut
        utterance_id: UtteranceId,
        /// Content part within the utterance
        content_index: u32,
        /// Audio kept, in milliseconds from the utterance start
        audio_end_ms: u64,
    },
}

impl SpeechEngineCommand {
    /// Short name used in logs
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AppendAudio { .. } => "append_audio",
            Self::Truncate { .. } => "truncate",
        }
    }
}

/// Side effect requested by the call session, performed in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayAction {
    /// Send a frame to the caller
    Telephony(TelephonyCommand),
    /// Send a command to the speech engine
    SpeechEngine(SpeechEngineCommand),
    /// Tear down the speech engine connection
    CloseSpeechEngine,
    /// Tear down the telephony connection
    CloseTelephony,
}
