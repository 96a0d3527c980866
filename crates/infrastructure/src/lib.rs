//! Infrastructure layer - Adapters for external systems
//!
//! Implements ports defined in the application layer and owns process-level
//! concerns: configuration loading and tracing initialisation.

pub mod adapters;
pub mod config;
pub mod telemetry;

pub use adapters::*;
pub use config::{AppConfig, ConfigValidationError, ServerConfig, TelephonyConfig};
pub use telemetry::{LogFormat, TelemetryConfig, TelemetryError, init_tracing};
