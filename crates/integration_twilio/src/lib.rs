//! Twilio integration
//!
//! Speaks the Twilio Media Streams WebSocket protocol and renders the TwiML
//! document that connects an incoming call to the media stream.

pub mod error;
pub mod media_stream;
pub mod twiml;

pub use error::TwilioError;
pub use media_stream::{encode_outbound, parse_inbound};
pub use twiml::{VoiceResponse, stream_url};
