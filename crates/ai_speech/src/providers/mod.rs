//! Speech engine provider implementations

pub mod openai_realtime;

pub use openai_realtime::OpenAIRealtimeClient;
