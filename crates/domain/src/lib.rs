//! Domain layer for VoiceBridge
//!
//! Contains the per-call relay state machine, its playback and interruption
//! policies, the event/action vocabulary exchanged with the adapters, and the
//! value objects identifying calls, streams, utterances and marks.
//! This layer performs no I/O and defines the ubiquitous language.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use value_objects::*;
