//! Twilio media stream WebSocket endpoint
//!
//! Each connection is one call. The socket is split: a reader task decodes
//! Twilio frames into telephony events, a writer task (the telephony outlet)
//! sends relay commands back, and the call relay runs in between.

use std::sync::Arc;

use application::CallRelay;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use domain::{CallSession, TelephonyEvent};
use futures::{StreamExt, stream::SplitStream};
use integration_twilio::parse_inbound;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::{
    state::{ActiveCallGuard, AppState},
    telephony_outlet::WebSocketTelephonyOutlet,
};

/// Upgrade the request and relay the call
pub async fn media_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| {
        let session = CallSession::new();
        let span = info_span!("call", call_id = %session.id());
        handle_call(socket, session, state).instrument(span)
    })
}

async fn handle_call(socket: WebSocket, session: CallSession, state: AppState) {
    let _active = ActiveCallGuard::new(&state.active_calls);
    info!("Client connected");

    let call_id = session.id();
    let buffer = state.config.relay.event_buffer;
    let (sink, stream) = socket.split();
    let (telephony_tx, telephony_rx) = mpsc::channel(buffer);
    let (engine_tx, engine_rx) = mpsc::channel(buffer);

    let outlet = WebSocketTelephonyOutlet::spawn(sink, buffer);
    let reader = tokio::spawn(read_frames(stream, telephony_tx).in_current_span());
    let speech_engine = state.speech_engine.open(call_id, engine_tx);

    let relay = CallRelay::new(
        session,
        speech_engine,
        Arc::new(outlet),
        state.config.relay.clone(),
    );
    let stats = relay
        .run(telephony_rx, engine_rx, state.shutdown.clone())
        .await;

    reader.abort();
    debug!(?stats, "Call finished");
}

/// Decode caller frames until the socket closes or the relay stops listening
async fn read_frames(mut stream: SplitStream<WebSocket>, events: mpsc::Sender<TelephonyEvent>) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match parse_inbound(text.as_str()) {
                Ok(event) => {
                    if events.send(event).await.is_err() {
                        return;
                    }
                },
                Err(e) => warn!(error = %e, "Error processing message"),
            },
            Ok(Message::Close(_)) => {
                info!("Client disconnected");
                return;
            },
            Ok(_) => {},
            Err(e) => {
                warn!(error = %e, "Caller socket error");
                return;
            },
        }
    }
}
