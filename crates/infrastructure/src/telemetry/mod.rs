//! Logging infrastructure
//!
//! Installs the global `tracing` subscriber: an `EnvFilter` and a `fmt`
//! layer rendering either human-readable text or JSON lines.

mod logging;

pub use logging::{LogFormat, TelemetryConfig, TelemetryError, init_tracing};
