//! Telephony stream identifier

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Opaque identifier the telephony side assigns when a media stream starts
///
/// Every outbound frame (`media`, `mark`, `clear`) must carry it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    /// Create a stream ID, rejecting blank values
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::invalid_identifier(
                "stream id",
                "must not be empty",
            ));
        }
        Ok(Self(value))
    }

    /// Get the stream ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StreamId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for StreamId {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_twilio_style_sid() {
        let id = StreamId::new("MZ18ad3ab5a668481ce02b83e7395059f0").unwrap();
        assert_eq!(id.as_str(), "MZ18ad3ab5a668481ce02b83e7395059f0");
    }

    #[test]
    fn rejects_blank() {
        assert!(StreamId::new("").is_err());
        assert!(StreamId::new("   ").is_err());
    }

    #[test]
    fn serializes_transparently() {
        let id = StreamId::new("MZ1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"MZ1\"");
    }
}
