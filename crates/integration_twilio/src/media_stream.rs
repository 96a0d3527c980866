//! Twilio Media Streams frame codec
//!
//! Inbound frames are JSON objects discriminated by `event`. Only `start`,
//! `media` and `mark` carry information the relay uses; every other event
//! (`connected`, `stop`, `dtmf`, ...) is surfaced as
//! [`TelephonyEvent::Other`].

use domain::{MarkName, StreamId, TelephonyCommand, TelephonyEvent};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::TwilioError;

/// Decode one inbound text frame
///
/// # Errors
///
/// Returns `TwilioError::MalformedFrame` for invalid JSON,
/// `TwilioError::MissingPayload` when a known event lacks its payload, and
/// `TwilioError::Domain` when `start` carries a blank stream identifier.
pub fn parse_inbound(text: &str) -> Result<TelephonyEvent, TwilioError> {
    let frame: InboundFrame = serde_json::from_str(text)?;
    frame.into_event()
}

/// Encode one outbound command as a text frame
pub fn encode_outbound(command: &TelephonyCommand) -> Result<String, TwilioError> {
    Ok(serde_json::to_string(&OutboundFrame::from(command))?)
}

#[derive(Debug, Deserialize)]
struct InboundFrame {
    event: String,
    #[serde(rename = "streamSid", default)]
    stream_sid: Option<String>,
    #[serde(default)]
    start: Option<StartPayload>,
    #[serde(default)]
    media: Option<MediaPayload>,
    #[serde(default)]
    mark: Option<MarkPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartPayload {
    #[serde(default)]
    stream_sid: Option<String>,
    #[serde(default)]
    call_sid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaPayload {
    payload: String,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    timestamp: u64,
}

#[derive(Debug, Deserialize)]
struct MarkPayload {
    #[serde(default)]
    name: String,
}

impl InboundFrame {
    fn into_event(self) -> Result<TelephonyEvent, TwilioError> {
        match self.event.as_str() {
            "start" => {
                let start = self.start.ok_or(TwilioError::MissingPayload {
                    event: "start",
                    field: "start",
                })?;
                let stream_sid = start
                    .stream_sid
                    .or(self.stream_sid)
                    .unwrap_or_default();
                Ok(TelephonyEvent::Start {
                    stream_id: StreamId::new(stream_sid)?,
                    call_sid: start.call_sid,
                })
            },
            "media" => {
                let media = self.media.ok_or(TwilioError::MissingPayload {
                    event: "media",
                    field: "media",
                })?;
                Ok(TelephonyEvent::Media {
                    timestamp_ms: media.timestamp,
                    payload: media.payload,
                })
            },
            "mark" => {
                let mark = self.mark.ok_or(TwilioError::MissingPayload {
                    event: "mark",
                    field: "mark",
                })?;
                Ok(TelephonyEvent::Mark {
                    name: MarkName::new(mark.name),
                })
            },
            _ => {
                trace!(
                    event = %self.event,
                    stream_sid = self.stream_sid.as_deref().unwrap_or("unknown"),
                    "Passing through non-media frame"
                );
                Ok(TelephonyEvent::Other { kind: self.event })
            },
        }
    }
}

/// Twilio sends `media.timestamp` as a decimal string; accept numbers too
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Number(u64),
        Text(String),
    }

    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Number(ms) => Ok(ms),
        RawTimestamp::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid media timestamp: {text:?}"))),
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum OutboundFrame<'a> {
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: &'a str,
        media: OutboundMedia<'a>,
    },
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: &'a str,
        mark: OutboundMark<'a>,
    },
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: &'a str,
    },
}

#[derive(Debug, Serialize)]
struct OutboundMedia<'a> {
    payload: &'a str,
}

#[derive(Debug, Serialize)]
struct OutboundMark<'a> {
    name: &'a str,
}

impl<'a> From<&'a TelephonyCommand> for OutboundFrame<'a> {
    fn from(command: &'a TelephonyCommand) -> Self {
        match command {
            TelephonyCommand::Media { stream_id, payload } => Self::Media {
                stream_sid: stream_id.as_str(),
                media: OutboundMedia { payload },
            },
            TelephonyCommand::Mark { stream_id, name } => Self::Mark {
                stream_sid: stream_id.as_str(),
                mark: OutboundMark {
                    name: name.as_str(),
                },
            },
            TelephonyCommand::Clear { stream_id } => Self::Clear {
                stream_sid: stream_id.as_str(),
            },
        }
    }
}
