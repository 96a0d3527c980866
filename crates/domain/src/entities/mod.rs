//! Domain entities - Objects with identity and lifecycle, and the policies
//! they own

mod barge_in;
mod call_session;
mod playback_tracker;
mod relay_action;
mod relay_event;

pub use barge_in::{BargeInController, Interruption, TRUNCATE_CONTENT_INDEX};
pub use call_session::{CallSession, CallState, CloseReason, EngineLink, SessionStats};
pub use playback_tracker::{ActiveUtterance, PlaybackMarkTracker};
pub use relay_action::{RelayAction, SpeechEngineCommand, TelephonyCommand};
pub use relay_event::{EngineErrorDetail, ResponseOutcome, SpeechEngineEvent, TelephonyEvent};
