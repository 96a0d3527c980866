//! VoiceBridge HTTP presentation layer
//!
//! Serves the Twilio webhook, the media stream WebSocket endpoint and a
//! couple of status routes.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod telephony_outlet;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
