//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure and presentation layers
//! implement these ports.

mod speech_engine_port;
mod telephony_port;

#[cfg(test)]
pub use speech_engine_port::{MockSpeechEngineConnector, MockSpeechEnginePort};
pub use speech_engine_port::{SpeechEngineConnector, SpeechEnginePort};
#[cfg(test)]
pub use telephony_port::MockTelephonyOutletPort;
pub use telephony_port::TelephonyOutletPort;
