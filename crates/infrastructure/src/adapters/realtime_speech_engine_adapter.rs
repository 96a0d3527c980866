//! Realtime speech engine adapter - Implements the speech engine ports using
//! the ai_speech crate
//!
//! Every call gets its own connection task. The task owns both halves of the
//! WebSocket and multiplexes the relay's commands with the engine's events,
//! so the relay never waits on the network.

use std::sync::Arc;

use ai_speech::{
    OpenAIRealtimeClient, RealtimeConfig, RealtimeReader, RealtimeWriter, ResponseStatus,
    ServerEvent, SpeechError,
};
use application::error::ApplicationError;
use application::ports::{SpeechEngineConnector, SpeechEnginePort};
use async_trait::async_trait;
use domain::{
    CallId, EngineErrorDetail, ResponseOutcome, SpeechEngineCommand, SpeechEngineEvent,
    UtteranceId,
};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Default capacity of the per-connection command channel
const DEFAULT_COMMAND_BUFFER: usize = 256;

/// Opens one OpenAI Realtime connection per call
#[derive(Clone)]
pub struct RealtimeSpeechEngineAdapter {
    client: Arc<OpenAIRealtimeClient>,
    command_buffer: usize,
}

impl std::fmt::Debug for RealtimeSpeechEngineAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeSpeechEngineAdapter")
            .field("provider", &"OpenAIRealtimeClient")
            .field("command_buffer", &self.command_buffer)
            .finish()
    }
}

impl RealtimeSpeechEngineAdapter {
    /// Create a new adapter
    ///
    /// # Errors
    ///
    /// Returns an error if the client configuration is invalid.
    pub fn new(config: RealtimeConfig) -> Result<Self, ApplicationError> {
        let client = OpenAIRealtimeClient::new(config).map_err(Self::map_error)?;

        Ok(Self {
            client: Arc::new(client),
            command_buffer: DEFAULT_COMMAND_BUFFER,
        })
    }

    /// Set the capacity of each connection's command channel
    #[must_use]
    pub fn with_command_buffer(mut self, command_buffer: usize) -> Self {
        self.command_buffer = command_buffer.max(1);
        self
    }

    /// Map speech error to application error
    fn map_error(err: SpeechError) -> ApplicationError {
        match err {
            SpeechError::Configuration(e) => ApplicationError::Configuration(e),
            SpeechError::ConnectionFailed(e) | SpeechError::SendFailed(e) => {
                ApplicationError::ExternalService(e)
            },
            SpeechError::ConnectionClosed => {
                ApplicationError::ConnectionClosed("speech engine".to_string())
            },
            SpeechError::InvalidResponse(e) => {
                ApplicationError::Internal(format!("Invalid response: {e}"))
            },
            SpeechError::Timeout(ms) => {
                ApplicationError::ExternalService(format!("Speech engine timeout after {ms}ms"))
            },
        }
    }
}

impl SpeechEngineConnector for RealtimeSpeechEngineAdapter {
    fn open(
        &self,
        call_id: CallId,
        events: mpsc::Sender<SpeechEngineEvent>,
    ) -> Arc<dyn SpeechEnginePort> {
        let (requests, requests_rx) = mpsc::channel(self.command_buffer);
        let client = Arc::clone(&self.client);

        tokio::spawn(
            run_connection(client, requests_rx, events)
                .instrument(info_span!("speech_engine", call_id = %call_id)),
        );

        Arc::new(RealtimeSpeechEngineHandle { requests })
    }
}

/// Message from the relay to a connection task
#[derive(Debug)]
enum EngineRequest {
    Command(SpeechEngineCommand),
    Close,
}

/// Relay-side handle of one connection
#[derive(Debug)]
struct RealtimeSpeechEngineHandle {
    requests: mpsc::Sender<EngineRequest>,
}

#[async_trait]
impl SpeechEnginePort for RealtimeSpeechEngineHandle {
    async fn send(&self, command: SpeechEngineCommand) -> Result<(), ApplicationError> {
        self.requests
            .send(EngineRequest::Command(command))
            .await
            .map_err(|_| ApplicationError::ConnectionClosed("speech engine".to_string()))
    }

    async fn close(&self) -> Result<(), ApplicationError> {
        // A gone task means the connection is already closed.
        let _ = self.requests.send(EngineRequest::Close).await;
        Ok(())
    }
}

async fn run_connection(
    client: Arc<OpenAIRealtimeClient>,
    mut requests: mpsc::Receiver<EngineRequest>,
    events: mpsc::Sender<SpeechEngineEvent>,
) {
    let connected = tokio::select! {
        result = client.connect() => result,
        () = discard_until_close(&mut requests) => {
            info!("Speech engine connection cancelled before it opened");
            let _ = events
                .send(SpeechEngineEvent::Closed {
                    reason: "closed before connecting".to_string(),
                })
                .await;
            return;
        },
    };

    let (mut writer, mut reader) = match connected {
        Ok(session) => session.split(),
        Err(e) => {
            error!(error = %e, "Failed to connect to the speech engine");
            drop(requests);
            let _ = events
                .send(SpeechEngineEvent::Closed {
                    reason: e.to_string(),
                })
                .await;
            return;
        },
    };

    if events.send(SpeechEngineEvent::Connected).await.is_err() {
        let _ = writer.close().await;
        return;
    }

    let reason = pump(&mut writer, &mut reader, &mut requests, &events).await;
    info!(reason = %reason, "Speech engine connection finished");
    // A relay blocked on a full queue must see the hangup before Closed can land.
    drop(requests);
    let _ = events.send(SpeechEngineEvent::Closed { reason }).await;
}

/// Drop commands issued before the connection opened; return on close
async fn discard_until_close(requests: &mut mpsc::Receiver<EngineRequest>) {
    while let Some(request) = requests.recv().await {
        match request {
            EngineRequest::Command(command) => {
                debug!(
                    command = command.kind(),
                    "Discarding command issued before the connection opened"
                );
            },
            EngineRequest::Close => return,
        }
    }
}

async fn pump(
    writer: &mut RealtimeWriter,
    reader: &mut RealtimeReader,
    requests: &mut mpsc::Receiver<EngineRequest>,
    events: &mpsc::Sender<SpeechEngineEvent>,
) -> String {
    // Translated event waiting for room in the relay's queue. Commands keep
    // draining while it waits.
    let mut pending: Option<SpeechEngineEvent> = None;
    loop {
        tokio::select! {
            request = requests.recv() => match request {
                Some(EngineRequest::Command(command)) => {
                    if let Err(e) = send_command(writer, command).await {
                        warn!(error = %e, "Failed to send command to the speech engine");
                        if matches!(
                            e,
                            SpeechError::ConnectionClosed | SpeechError::ConnectionFailed(_)
                        ) {
                            return "connection lost while sending".to_string();
                        }
                    }
                },
                Some(EngineRequest::Close) | None => {
                    if let Err(e) = writer.close().await {
                        debug!(error = %e, "Close frame not delivered");
                    }
                    return "closed by relay".to_string();
                },
            },
            permit = events.reserve(), if pending.is_some() => match permit {
                Ok(permit) => {
                    if let Some(event) = pending.take() {
                        permit.send(event);
                    }
                },
                Err(_) => {
                    let _ = writer.close().await;
                    return "relay stopped listening".to_string();
                },
            },
            event = reader.next_event(), if pending.is_none() => match event {
                Some(Ok(server_event)) => pending = translate_event(server_event),
                Some(Err(SpeechError::InvalidResponse(e))) => {
                    warn!(error = %e, "Error processing speech engine message");
                },
                Some(Err(e)) => {
                    error!(error = %e, "Speech engine connection failed");
                    return e.to_string();
                },
                None => return "connection closed by speech engine".to_string(),
            },
        }
    }
}

async fn send_command(
    writer: &mut RealtimeWriter,
    command: SpeechEngineCommand,
) -> Result<(), SpeechError> {
    match command {
        SpeechEngineCommand::AppendAudio { payload } => writer.append_audio(payload).await,
        SpeechEngineCommand::Truncate {
            utterance_id,
            content_index,
            audio_end_ms,
        } => {
            debug!(
                utterance_id = %utterance_id,
                audio_end_ms,
                "Sending truncation event"
            );
            writer
                .truncate(utterance_id.as_str().to_owned(), content_index, audio_end_ms)
                .await
        },
    }
}

/// Map a wire event onto what the relay cares about
fn translate_event(event: ServerEvent) -> Option<SpeechEngineEvent> {
    match event {
        ServerEvent::ResponseAudioDelta { item_id, delta } => {
            if delta.is_empty() {
                return None;
            }
            match UtteranceId::new(item_id) {
                Ok(utterance_id) => Some(SpeechEngineEvent::AudioDelta {
                    utterance_id,
                    payload: delta,
                }),
                Err(e) => {
                    warn!(error = %e, "Dropping audio delta without item id");
                    None
                },
            }
        },
        ServerEvent::SpeechStarted => Some(SpeechEngineEvent::SpeechStarted),
        ServerEvent::SpeechStopped => Some(SpeechEngineEvent::SpeechStopped),
        ServerEvent::ResponseDone { response } => {
            let outcome = match response.status {
                ResponseStatus::Completed => ResponseOutcome::Completed,
                ResponseStatus::Cancelled => ResponseOutcome::Cancelled,
                ResponseStatus::Incomplete => ResponseOutcome::Incomplete,
                ResponseStatus::Failed => {
                    ResponseOutcome::Failed(response.error().cloned().map(into_detail))
                },
                ResponseStatus::InProgress => return None,
            };
            Some(SpeechEngineEvent::ResponseDone(outcome))
        },
        ServerEvent::Error { error } => Some(SpeechEngineEvent::Error(into_detail(error))),
        ServerEvent::SessionCreated
        | ServerEvent::SessionUpdated
        | ServerEvent::InputAudioBufferCommitted
        | ServerEvent::RateLimitsUpdated
        | ServerEvent::Other => None,
    }
}

fn into_detail(error: ai_speech::ErrorBody) -> EngineErrorDetail {
    EngineErrorDetail {
        kind: error.kind,
        code: error.code,
        message: error.message,
    }
}
