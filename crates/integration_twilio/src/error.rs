//! Twilio integration errors

use domain::DomainError;
use thiserror::Error;

/// Errors raised while decoding or encoding Twilio frames
#[derive(Debug, Error)]
pub enum TwilioError {
    /// Frame is not valid JSON or does not match the expected shape
    #[error("Malformed frame: {0}")]
    MalformedFrame(#[from] serde_json::Error),

    /// A known event is missing its payload object
    #[error("Missing '{field}' payload in '{event}' event")]
    MissingPayload {
        /// Event name
        event: &'static str,
        /// Missing field
        field: &'static str,
    },

    /// An identifier carried by the frame is invalid
    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_payload_message() {
        let err = TwilioError::MissingPayload {
            event: "media",
            field: "media",
        };
        assert_eq!(err.to_string(), "Missing 'media' payload in 'media' event");
    }

    #[test]
    fn malformed_frame_message() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = TwilioError::from(json_err);
        assert!(err.to_string().starts_with("Malformed frame:"));
    }
}
