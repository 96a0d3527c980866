//! AI Speech - Realtime speech-to-speech engine client
//!
//! Provides a client for the OpenAI Realtime API over WebSocket:
//! - `config` holds the connection and session settings
//! - `protocol` defines the JSON events exchanged with the engine
//! - `providers` contains the WebSocket client
//!
//! # Example
//!
//! ```ignore
//! use ai_speech::{OpenAIRealtimeClient, RealtimeConfig};
//!
//! let client = OpenAIRealtimeClient::new(config)?;
//! let (mut writer, mut reader) = client.connect().await?.split();
//!
//! writer.append_audio(payload).await?;
//! while let Some(event) = reader.next_event().await {
//!     println!("{:?}", event?);
//! }
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod providers;

pub use config::RealtimeConfig;
pub use error::SpeechError;
pub use protocol::{ClientEvent, ErrorBody, ResponseStatus, ServerEvent};
pub use providers::openai_realtime::{
    OpenAIRealtimeClient, RealtimeReader, RealtimeSession, RealtimeWriter,
};
