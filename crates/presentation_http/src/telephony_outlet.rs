//! Telephony outlet - writes relay commands to the caller's WebSocket

use application::{ApplicationError, TelephonyOutletPort};
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use domain::TelephonyCommand;
use futures::{SinkExt, stream::SplitSink};
use integration_twilio::encode_outbound;
use tokio::sync::mpsc;
use tracing::debug;

/// Queues frames for a writer task that owns the socket's sending half
#[derive(Debug, Clone)]
pub struct WebSocketTelephonyOutlet {
    frames: mpsc::Sender<Message>,
}

impl WebSocketTelephonyOutlet {
    /// Spawn the writer task for `sink`
    pub fn spawn(sink: SplitSink<WebSocket, Message>, buffer: usize) -> Self {
        let (frames, frames_rx) = mpsc::channel(buffer.max(1));
        tokio::spawn(write_frames(sink, frames_rx));
        Self { frames }
    }
}

#[async_trait]
impl TelephonyOutletPort for WebSocketTelephonyOutlet {
    async fn send(&self, command: TelephonyCommand) -> Result<(), ApplicationError> {
        let text = encode_outbound(&command)
            .map_err(|e| ApplicationError::Internal(format!("Failed to encode frame: {e}")))?;
        self.frames
            .send(Message::Text(text.into()))
            .await
            .map_err(|_| ApplicationError::ConnectionClosed("telephony".to_string()))
    }

    async fn close(&self) -> Result<(), ApplicationError> {
        // The writer is gone once the socket is closed.
        let _ = self.frames.send(Message::Close(None)).await;
        Ok(())
    }
}

async fn write_frames(
    mut sink: SplitSink<WebSocket, Message>,
    mut frames: mpsc::Receiver<Message>,
) {
    while let Some(frame) = frames.recv().await {
        let is_close = matches!(frame, Message::Close(_));
        if let Err(e) = sink.send(frame).await {
            debug!(error = %e, "Caller socket no longer writable");
            return;
        }
        if is_close {
            return;
        }
    }

    let _ = sink.close().await;
}
