//! Application layer - Use cases and orchestration
//!
//! Defines the ports the relay needs from the outside world and the
//! per-call relay service that drives a domain [`domain::CallSession`]
//! from the two connection event streams.

pub mod error;
pub mod ports;
pub mod services;

pub use error::ApplicationError;
pub use ports::*;
pub use services::*;
