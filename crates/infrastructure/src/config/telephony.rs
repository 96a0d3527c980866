//! Telephony-facing configuration: call setup document and stream endpoint.

use serde::{Deserialize, Serialize};

/// Telephony configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelephonyConfig {
    /// Path of the media stream WebSocket endpoint
    #[serde(default = "default_stream_path")]
    pub stream_path: String,

    /// Message spoken to the caller before the stream connects
    #[serde(default = "default_intro_message")]
    pub intro_message: String,

    /// Pause between the two messages, in seconds
    #[serde(default = "default_pause_secs")]
    pub pause_secs: u32,

    /// Message spoken right before the stream connects
    #[serde(default = "default_ready_message")]
    pub ready_message: String,
}

fn default_stream_path() -> String {
    "/media-stream".to_string()
}

// Punctuation helps the telephony text-to-speech pronounce the acronyms.
fn default_intro_message() -> String {
    "Please wait while we connect your call to the A. I. voice assistant, \
     powered by Twilio and the Open-A.I. Realtime API"
        .to_string()
}

const fn default_pause_secs() -> u32 {
    1
}

fn default_ready_message() -> String {
    "O.K. you can start talking!".to_string()
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            stream_path: default_stream_path(),
            intro_message: default_intro_message(),
            pause_secs: default_pause_secs(),
            ready_message: default_ready_message(),
        }
    }
}
