//! Playback mark token

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque token attached to a playback checkpoint sent to the telephony side
///
/// Acknowledgments are matched by order, never by value, so the name only
/// needs to be unique enough to be readable in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkName(String);

impl MarkName {
    /// Prefix of marks generated for forwarded response audio
    pub const RESPONSE_PART: &'static str = "responsePart";

    /// Wrap a mark name received from the telephony side
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Mark emitted after the `sequence`-th forwarded response chunk
    pub fn response_part(sequence: u64) -> Self {
        Self(format!("{}-{sequence}", Self::RESPONSE_PART))
    }

    /// Get the mark name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_part_is_sequenced() {
        assert_eq!(MarkName::response_part(3).as_str(), "responsePart-3");
        assert_ne!(MarkName::response_part(1), MarkName::response_part(2));
    }

    #[test]
    fn wraps_peer_value_verbatim() {
        assert_eq!(MarkName::new("anything").to_string(), "anything");
    }
}
