//! Call relay service - Drives one call session
//!
//! A relay owns the [`CallSession`] of a single call and is the only consumer
//! of that call's two event streams. Events are merged into one loop, applied
//! to the session, and the resulting actions are carried out in order through
//! the ports. The loop ends once the session is closed.

use std::{fmt, sync::Arc, time::Duration};

use domain::{
    CallSession, CloseReason, RelayAction, ResponseOutcome, SessionStats, SpeechEngineEvent,
    TelephonyEvent,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::error::ApplicationError;
use crate::ports::{SpeechEnginePort, TelephonyOutletPort};

/// Default capacity of each per-call event channel
const DEFAULT_EVENT_BUFFER: usize = 256;

/// Default bound on tearing down a peer connection
const DEFAULT_CLOSE_TIMEOUT_MS: u64 = 2_000;

/// Configuration for call relaying
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Capacity of the telephony and speech engine event channels
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Upper bound on closing a peer connection, in milliseconds
    #[serde(default = "default_close_timeout_ms")]
    pub close_timeout_ms: u64,
}

const fn default_event_buffer() -> usize {
    DEFAULT_EVENT_BUFFER
}

const fn default_close_timeout_ms() -> u64 {
    DEFAULT_CLOSE_TIMEOUT_MS
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            event_buffer: default_event_buffer(),
            close_timeout_ms: default_close_timeout_ms(),
        }
    }
}

impl RelayConfig {
    /// Close timeout as a duration
    pub const fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}

/// Relays one call between the telephony side and the speech engine
pub struct CallRelay {
    session: CallSession,
    speech_engine: Arc<dyn SpeechEnginePort>,
    telephony: Arc<dyn TelephonyOutletPort>,
    config: RelayConfig,
}

impl fmt::Debug for CallRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallRelay")
            .field("call_id", &self.session.id())
            .field("state", &self.session.state())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CallRelay {
    /// Create a relay for a fresh session
    pub fn new(
        session: CallSession,
        speech_engine: Arc<dyn SpeechEnginePort>,
        telephony: Arc<dyn TelephonyOutletPort>,
        config: RelayConfig,
    ) -> Self {
        Self {
            session,
            speech_engine,
            telephony,
            config,
        }
    }

    /// Run the call until either side disconnects or shutdown is signalled
    ///
    /// A closed telephony channel means the caller hung up; a closed speech
    /// engine channel means the engine connection is gone. Either way the
    /// other side is torn down within the configured close timeout.
    #[instrument(skip_all, fields(call_id = %self.session.id()))]
    pub async fn run(
        mut self,
        mut telephony_events: mpsc::Receiver<TelephonyEvent>,
        mut engine_events: mpsc::Receiver<SpeechEngineEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> SessionStats {
        info!("Call relay started");

        // A call accepted after shutdown began would never see the change.
        if *shutdown.borrow_and_update() {
            info!("Shutdown already requested, ending call");
            let actions = self.session.close(CloseReason::Shutdown);
            self.perform(actions).await;
        }

        while !self.session.is_closed() {
            let actions = tokio::select! {
                event = telephony_events.recv() => match event {
                    Some(event) => self.on_telephony_event(event),
                    None => {
                        info!("Client disconnected");
                        self.session.close(CloseReason::TelephonyDisconnected)
                    },
                },
                event = engine_events.recv() => match event {
                    Some(event) => self.on_speech_engine_event(event),
                    None => {
                        warn!("Speech engine event stream ended without close notice");
                        self.session.close(CloseReason::SpeechEngineDisconnected)
                    },
                },
                Ok(()) = shutdown.changed() => {
                    info!("Shutdown requested, ending call");
                    self.session.close(CloseReason::Shutdown)
                },
            };

            self.perform(actions).await;
        }

        let stats = self.session.stats();
        info!(
            inbound_frames = stats.inbound_frames,
            forwarded_frames = stats.forwarded_frames,
            dropped_frames = stats.dropped_frames,
            outbound_chunks = stats.outbound_chunks,
            interruptions = stats.interruptions,
            "Call relay finished"
        );
        stats
    }

    fn on_telephony_event(&mut self, event: TelephonyEvent) -> Vec<RelayAction> {
        match &event {
            TelephonyEvent::Start {
                stream_id,
                call_sid,
            } => info!(
                stream_id = %stream_id,
                call_sid = call_sid.as_deref().unwrap_or("unknown"),
                "Incoming stream has started"
            ),
            TelephonyEvent::Media { timestamp_ms, .. } => {
                trace!(timestamp_ms, "Inbound media frame");
            },
            TelephonyEvent::Mark { name } => debug!(mark = %name, "Playback mark acknowledged"),
            TelephonyEvent::Other { kind } => info!(event = %kind, "Received non-media event"),
        }

        self.session.handle_telephony_event(event)
    }

    fn on_speech_engine_event(&mut self, event: SpeechEngineEvent) -> Vec<RelayAction> {
        match &event {
            SpeechEngineEvent::Connected => info!("Connected to the speech engine"),
            SpeechEngineEvent::SpeechStarted => return self.on_speech_started(),
            SpeechEngineEvent::SpeechStopped => debug!("Caller stopped speaking"),
            SpeechEngineEvent::AudioDelta { utterance_id, .. } => {
                trace!(utterance_id = %utterance_id, "Response audio chunk");
            },
            SpeechEngineEvent::ResponseDone(ResponseOutcome::Failed(detail)) => match detail {
                Some(detail) => error!(
                    error_type = detail.kind.as_deref().unwrap_or("unknown"),
                    error_code = detail.code.as_deref().unwrap_or("unknown"),
                    error_message = %detail.message,
                    "Response generation failed"
                ),
                None => error!("Response generation failed without details"),
            },
            SpeechEngineEvent::ResponseDone(outcome) => debug!(?outcome, "Response finished"),
            SpeechEngineEvent::Error(detail) => error!(error = %detail, "Speech engine error"),
            SpeechEngineEvent::Closed { reason } => {
                info!(reason = %reason, "Disconnected from the speech engine");
            },
        }

        self.session.handle_speech_engine_event(event)
    }

    fn on_speech_started(&mut self) -> Vec<RelayAction> {
        debug!("Speech started detected");

        let Some(interruption) = self.session.interrupt() else {
            return Vec::new();
        };

        debug!(
            utterance_id = %interruption.utterance_id,
            started_at_ms = interruption.started_at_ms,
            interrupted_at_ms = interruption.interrupted_at_ms,
            elapsed_ms = interruption.audio_end_ms,
            "Truncating interrupted response"
        );
        self.session.interruption_actions(interruption)
    }

    async fn perform(&self, actions: Vec<RelayAction>) {
        for action in actions {
            match action {
                RelayAction::Telephony(command) => {
                    let kind = command.kind();
                    if let Err(e) = self.telephony.send(command).await {
                        log_send_failure(&e, "telephony", kind);
                    }
                },
                RelayAction::SpeechEngine(command) => {
                    let kind = command.kind();
                    if let Err(e) = self.speech_engine.send(command).await {
                        log_send_failure(&e, "speech_engine", kind);
                    }
                },
                RelayAction::CloseSpeechEngine => {
                    self.bounded_close("speech_engine", self.speech_engine.close())
                        .await;
                },
                RelayAction::CloseTelephony => {
                    self.bounded_close("telephony", self.telephony.close()).await;
                },
            }
        }
    }

    async fn bounded_close<F>(&self, side: &'static str, close: F)
    where
        F: Future<Output = Result<(), ApplicationError>>,
    {
        match timeout(self.config.close_timeout(), close).await {
            Ok(Ok(())) => debug!(side, "Connection closed"),
            Ok(Err(e)) => warn!(side, error = %e, "Failed to close connection"),
            Err(_) => warn!(
                side,
                timeout_ms = self.config.close_timeout_ms,
                "Timed out closing connection"
            ),
        }
    }
}

fn log_send_failure(error: &ApplicationError, side: &'static str, command: &'static str) {
    if error.is_connection_closed() {
        debug!(side, command, error = %error, "Peer gone, command not sent");
    } else {
        warn!(side, command, error = %error, "Failed to send command");
    }
}
