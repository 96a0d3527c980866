//! Twilio incoming-call webhook
//!
//! Answers with TwiML that greets the caller and connects the call audio to
//! the media stream endpoint on this server.

use axum::{
    extract::State,
    http::{HeaderMap, header},
    response::IntoResponse,
};
use integration_twilio::{VoiceResponse, stream_url};
use tracing::{debug, instrument};

use crate::{error::ApiError, state::AppState};

/// Handle the incoming-call webhook (GET or POST)
#[instrument(skip_all)]
pub async fn incoming_call(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let server = &state.config.server;
    let telephony = &state.config.telephony;

    let host = match &server.public_host {
        Some(host) => host.clone(),
        None => headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or_else(|| ApiError::BadRequest("missing Host header".to_string()))?,
    };

    let url = stream_url(&host, &telephony.stream_path);
    debug!(stream_url = %url, "Answering incoming call");

    let twiml = VoiceResponse::new()
        .say(telephony.intro_message.as_str())
        .pause(telephony.pause_secs)
        .say(telephony.ready_message.as_str())
        .connect_stream(url)
        .render();

    Ok(([(header::CONTENT_TYPE, "text/xml")], twiml))
}
