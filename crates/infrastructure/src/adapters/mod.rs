//! Infrastructure adapters
//!
//! Adapters connect application ports to concrete implementations.

mod realtime_speech_engine_adapter;

pub use realtime_speech_engine_adapter::RealtimeSpeechEngineAdapter;
