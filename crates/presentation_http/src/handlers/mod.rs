//! HTTP and WebSocket request handlers

pub mod health;
pub mod incoming_call;
pub mod media_stream;
