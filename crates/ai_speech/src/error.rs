//! Speech engine errors

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors that can occur while talking to the speech engine
#[derive(Debug, Error)]
pub enum SpeechError {
    /// Failed to connect to the speech engine
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The connection is closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// Sending a frame failed
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The engine sent something that could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Timeout while connecting
    #[error("Speech engine timeout after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<tungstenite::Error> for SpeechError {
    fn from(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                Self::ConnectionClosed
            },
            tungstenite::Error::Io(e) => Self::ConnectionFailed(e.to_string()),
            tungstenite::Error::Http(response) => Self::ConnectionFailed(format!(
                "handshake rejected with HTTP {}",
                response.status()
            )),
            other => Self::SendFailed(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for SpeechError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_failed_error_message() {
        let err = SpeechError::ConnectionFailed("refused".to_string());
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn timeout_error_message() {
        let err = SpeechError::Timeout(10_000);
        assert_eq!(err.to_string(), "Speech engine timeout after 10000ms");
    }

    #[test]
    fn configuration_error_message() {
        let err = SpeechError::Configuration("missing key".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing key");
    }

    #[test]
    fn closed_socket_maps_to_connection_closed() {
        let err: SpeechError = tungstenite::Error::ConnectionClosed.into();
        assert!(matches!(err, SpeechError::ConnectionClosed));

        let err: SpeechError = tungstenite::Error::AlreadyClosed.into();
        assert!(matches!(err, SpeechError::ConnectionClosed));
    }

    #[test]
    fn io_error_maps_to_connection_failed() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: SpeechError = tungstenite::Error::Io(io).into();
        assert!(matches!(err, SpeechError::ConnectionFailed(_)));
    }

    #[test]
    fn json_error_maps_to_invalid_response() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: SpeechError = json_err.into();
        assert!(matches!(err, SpeechError::InvalidResponse(_)));
    }
}
