//! Value Objects - Immutable, identity-less domain primitives

mod call_id;
mod mark_name;
mod stream_id;
mod utterance_id;

pub use call_id::CallId;
pub use mark_name::MarkName;
pub use stream_id::StreamId;
pub use utterance_id::UtteranceId;
