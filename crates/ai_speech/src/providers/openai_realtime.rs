//! OpenAI Realtime provider
//!
//! One WebSocket connection per call. After the handshake the client waits
//! the configured settle delay, configures the session with exactly one
//! `session.update` and, in greet-first mode, asks the assistant to open the
//! conversation. The connection then splits into a writer and a reader so
//! the two directions can be driven independently.

use std::sync::Arc;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, instrument, trace, warn};

use crate::config::RealtimeConfig;
use crate::error::SpeechError;
use crate::protocol::{self, ClientEvent, ServerEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Beta header required by the Realtime API
const OPENAI_BETA_HEADER: &str = "OpenAI-Beta";
const OPENAI_BETA_VALUE: &str = "realtime=v1";

/// Client opening Realtime sessions
#[derive(Debug, Clone)]
pub struct OpenAIRealtimeClient {
    config: Arc<RealtimeConfig>,
}

impl OpenAIRealtimeClient {
    /// Create a new Realtime client
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Configuration` if the configuration is invalid.
    pub fn new(config: RealtimeConfig) -> Result<Self, SpeechError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Client configuration
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Open and configure a session
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake fails or times out, or if the
    /// session configuration cannot be sent.
    #[instrument(skip(self), fields(model = %self.config.model))]
    pub async fn connect(&self) -> Result<RealtimeSession, SpeechError> {
        let request = self.build_request()?;

        let (stream, _response) = timeout(self.config.connect_timeout(), connect_async(request))
            .await
            .map_err(|_| SpeechError::Timeout(self.config.connect_timeout_ms))??;
        info!("Connected to the OpenAI Realtime API");

        let (sink, stream) = stream.split();
        let mut writer = RealtimeWriter { sink, closed: false };
        let reader = RealtimeReader {
            stream,
            config: Arc::clone(&self.config),
        };

        sleep(self.config.settle_delay()).await;

        let session_update = ClientEvent::session_update(&self.config);
        debug!(voice = %self.config.voice, "Sending session update");
        writer.send(&session_update).await?;

        if self.config.greet_first {
            debug!("Sending initial conversation item");
            writer
                .send(&ClientEvent::greeting(self.config.greeting_prompt.clone()))
                .await?;
            writer.send(&ClientEvent::ResponseCreate).await?;
        }

        Ok(RealtimeSession { writer, reader })
    }

    fn build_request(
        &self,
    ) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request, SpeechError> {
        let api_key = self
            .config
            .api_key()
            .ok_or_else(|| SpeechError::Configuration("OpenAI API key is required".to_string()))?;

        let mut request = self
            .config
            .endpoint()
            .into_client_request()
            .map_err(|e| SpeechError::Configuration(format!("Invalid realtime URL: {e}")))?;

        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| SpeechError::Configuration("API key is not a valid header".to_string()))?;
        let headers = request.headers_mut();
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(
            OPENAI_BETA_HEADER,
            HeaderValue::from_static(OPENAI_BETA_VALUE),
        );

        Ok(request)
    }
}

/// A configured Realtime session
#[derive(Debug)]
pub struct RealtimeSession {
    writer: RealtimeWriter,
    reader: RealtimeReader,
}

impl RealtimeSession {
    /// Split into independently owned halves
    pub fn split(self) -> (RealtimeWriter, RealtimeReader) {
        (self.writer, self.reader)
    }
}

/// Sending half of a Realtime session
pub struct RealtimeWriter {
    sink: SplitSink<WsStream, Message>,
    closed: bool,
}

impl std::fmt::Debug for RealtimeWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeWriter")
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl RealtimeWriter {
    /// Send one client event
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::ConnectionClosed` after [`Self::close`], or the
    /// transport error if the frame could not be written.
    pub async fn send(&mut self, event: &ClientEvent) -> Result<(), SpeechError> {
        if self.closed {
            return Err(SpeechError::ConnectionClosed);
        }
        let json = event.to_json()?;
        trace!(event_type = event.event_type(), "Sending realtime event");
        self.sink.send(Message::Text(json.into())).await?;
        Ok(())
    }

    /// Append caller audio to the input buffer
    pub async fn append_audio(&mut self, audio: String) -> Result<(), SpeechError> {
        self.send(&ClientEvent::InputAudioBufferAppend { audio }).await
    }

    /// Truncate an assistant item at `audio_end_ms`
    pub async fn truncate(
        &mut self,
        item_id: String,
        content_index: u32,
        audio_end_ms: u64,
    ) -> Result<(), SpeechError> {
        self.send(&ClientEvent::ConversationItemTruncate {
            item_id,
            content_index,
            audio_end_ms,
        })
        .await
    }

    /// Send a close frame; further calls are no-ops
    pub async fn close(&mut self) -> Result<(), SpeechError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.sink.send(Message::Close(None)).await {
            Ok(()) | Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Receiving half of a Realtime session
pub struct RealtimeReader {
    stream: SplitStream<WsStream>,
    config: Arc<RealtimeConfig>,
}

impl std::fmt::Debug for RealtimeReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeReader").finish_non_exhaustive()
    }
}

impl RealtimeReader {
    /// Next server event
    ///
    /// Returns `None` once the connection is closed. A frame that cannot be
    /// parsed yields `Some(Err(_))`; the connection stays usable.
    pub async fn next_event(&mut self) -> Option<Result<ServerEvent, SpeechError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => {
                    let err = SpeechError::from(e);
                    if matches!(err, SpeechError::ConnectionClosed) {
                        return None;
                    }
                    return Some(Err(err));
                },
            };

            match message {
                Message::Text(text) => return Some(self.parse(text.as_str())),
                Message::Close(frame) => {
                    debug!(?frame, "Realtime connection closed by server");
                    return None;
                },
                Message::Binary(_) => warn!("Ignoring unexpected binary frame"),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {},
            }
        }
    }

    fn parse(&self, text: &str) -> Result<ServerEvent, SpeechError> {
        if let Some(event_type) = protocol::event_type(text) {
            if self.config.should_log(&event_type) {
                info!(event_type = %event_type, payload = %text, "Received event");
            }
        }
        ServerEvent::parse(text)
    }
}
