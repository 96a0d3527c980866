//! Status handlers

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Banner returned by the root route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

/// Root route - confirms the server is up
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Twilio Media Stream Server is running!".to_string(),
    })
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_calls: usize,
}

/// Liveness check - is the server running?
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_calls: state.active_calls(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serialization() {
        let resp = HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
            active_calls: 2,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"active_calls\":2"));
    }

    #[tokio::test]
    async fn root_banner() {
        let Json(resp) = root().await;
        assert_eq!(resp.message, "Twilio Media Stream Server is running!");
    }
}
