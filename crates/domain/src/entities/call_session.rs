//! Call session entity - per-call relay state machine
//!
//! A `CallSession` is the single owner of everything mutable about one
//! relayed call. It never performs I/O: each `handle_*` method mutates the
//! state and returns the ordered list of [`RelayAction`]s the caller must
//! carry out through the adapters.

use serde::{Deserialize, Serialize};

use crate::entities::barge_in::{BargeInController, Interruption, TRUNCATE_CONTENT_INDEX};
use crate::entities::playback_tracker::PlaybackMarkTracker;
use crate::entities::relay_action::{RelayAction, SpeechEngineCommand, TelephonyCommand};
use crate::entities::relay_event::{SpeechEngineEvent, TelephonyEvent};
use crate::value_objects::{CallId, StreamId, UtteranceId};

/// Lifecycle state of a call session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    /// Telephony connection accepted, no `start` event yet
    AwaitingStreamStart,
    /// A media stream is running
    Active,
    /// Terminal
    Closed,
}

impl CallState {
    /// Check if the state is terminal
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// State of the speech engine connection as seen by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineLink {
    /// Connection being established; audio is not forwarded yet
    Connecting,
    /// Connection open and configured
    Open,
    /// Connection gone
    Closed,
}

/// Why a session is being closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The caller's telephony connection ended
    TelephonyDisconnected,
    /// The speech engine connection ended
    SpeechEngineDisconnected,
    /// The process is shutting down
    Shutdown,
}

/// Counters reported when a call ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Inbound audio frames received
    pub inbound_frames: u64,
    /// Inbound frames forwarded to the speech engine
    pub forwarded_frames: u64,
    /// Inbound frames dropped because the engine was not open
    pub dropped_frames: u64,
    /// Out-of-order frames whose timestamp was clamped
    pub clamped_frames: u64,
    /// Response audio chunks forwarded to the caller
    pub outbound_chunks: u64,
    /// Mark acknowledgments consumed
    pub acknowledged_marks: u64,
    /// Barge-ins that truncated an utterance
    pub interruptions: u64,
}

/// Per-call relay state
#[derive(Debug, Clone)]
pub struct CallSession {
    id: CallId,
    state: CallState,
    engine: EngineLink,
    stream_id: Option<StreamId>,
    latest_inbound_timestamp: u64,
    playback: PlaybackMarkTracker,
    barge_in: BargeInController,
    stats: SessionStats,
}

impl CallSession {
    /// Create a session for a freshly accepted telephony connection
    pub fn new() -> Self {
        Self::with_id(CallId::new())
    }

    /// Create a session with a known call ID
    pub fn with_id(id: CallId) -> Self {
        Self {
            id,
            state: CallState::AwaitingStreamStart,
            engine: EngineLink::Connecting,
            stream_id: None,
            latest_inbound_timestamp: 0,
            playback: PlaybackMarkTracker::new(),
            barge_in: BargeInController::new(),
            stats: SessionStats::default(),
        }
    }

    /// Apply an event from the telephony side
    pub fn handle_telephony_event(&mut self, event: TelephonyEvent) -> Vec<RelayAction> {
        if self.state.is_terminal() {
            return Vec::new();
        }

        match event {
            TelephonyEvent::Start { stream_id, .. } => {
                self.start_stream(stream_id);
                Vec::new()
            },
            TelephonyEvent::Media {
                timestamp_ms,
                payload,
            } => self.accept_media(timestamp_ms, payload),
            TelephonyEvent::Mark { .. } => {
                if self.playback.acknowledge().is_some() {
                    self.stats.acknowledged_marks += 1;
                }
                Vec::new()
            },
            TelephonyEvent::Other { .. } => Vec::new(),
        }
    }

    /// Apply an event from the speech engine side
    pub fn handle_speech_engine_event(&mut self, event: SpeechEngineEvent) -> Vec<RelayAction> {
        if self.state.is_terminal() {
            return Vec::new();
        }

        match event {
            SpeechEngineEvent::Connected => {
                self.engine = EngineLink::Open;
                Vec::new()
            },
            SpeechEngineEvent::AudioDelta {
                utterance_id,
                payload,
            } => self.forward_audio_delta(&utterance_id, payload),
            SpeechEngineEvent::SpeechStarted => self
                .interrupt()
                .map(|interruption| self.interruption_actions(interruption))
                .unwrap_or_default(),
            SpeechEngineEvent::Closed { .. } => {
                self.engine = EngineLink::Closed;
                self.close(CloseReason::SpeechEngineDisconnected)
            },
            SpeechEngineEvent::SpeechStopped
            | SpeechEngineEvent::ResponseDone(_)
            | SpeechEngineEvent::Error(_) => Vec::new(),
        }
    }

    /// Close the session
    ///
    /// Idempotent: only the first call returns actions. The speech engine is
    /// torn down unless it already went away; the telephony side is torn
    /// down unless it is the side that disconnected.
    pub fn close(&mut self, reason: CloseReason) -> Vec<RelayAction> {
        if self.state.is_terminal() {
            return Vec::new();
        }
        self.state = CallState::Closed;

        let mut actions = Vec::with_capacity(2);
        if self.engine != EngineLink::Closed {
            self.engine = EngineLink::Closed;
            actions.push(RelayAction::CloseSpeechEngine);
        }
        if reason != CloseReason::TelephonyDisconnected {
            actions.push(RelayAction::CloseTelephony);
        }
        actions
    }

    /// Run the barge-in policy against the current playback state
    ///
    /// Exposed separately from [`Self::handle_speech_engine_event`] so the
    /// caller can log the timing of an interruption before acting on it.
    pub fn interrupt(&mut self) -> Option<Interruption> {
        let interruption = self
            .barge_in
            .on_speech_started(&mut self.playback, self.latest_inbound_timestamp)?;
        self.stats.interruptions += 1;
        Some(interruption)
    }

    /// Actions that cut an interrupted utterance on both sides
    pub fn interruption_actions(&self, interruption: Interruption) -> Vec<RelayAction> {
        let mut actions = vec![RelayAction::SpeechEngine(SpeechEngineCommand::Truncate {
            utterance_id: interruption.utterance_id,
            content_index: TRUNCATE_CONTENT_INDEX,
            audio_end_ms: interruption.audio_end_ms,
        })];
        if let Some(stream_id) = &self.stream_id {
            actions.push(RelayAction::Telephony(TelephonyCommand::Clear {
                stream_id: stream_id.clone(),
            }));
        }
        actions
    }

    fn start_stream(&mut self, stream_id: StreamId) {
        self.stream_id = Some(stream_id);
        self.latest_inbound_timestamp = 0;
        self.playback.reset();
        self.state = CallState::Active;
    }

    fn accept_media(&mut self, timestamp_ms: u64, payload: String) -> Vec<RelayAction> {
        self.stats.inbound_frames += 1;

        if timestamp_ms >= self.latest_inbound_timestamp {
            self.latest_inbound_timestamp = timestamp_ms;
        } else {
            self.stats.clamped_frames += 1;
        }

        if self.engine != EngineLink::Open {
            self.stats.dropped_frames += 1;
            return Vec::new();
        }

        self.stats.forwarded_frames += 1;
        vec![RelayAction::SpeechEngine(SpeechEngineCommand::AppendAudio {
            payload,
        })]
    }

    fn forward_audio_delta(&mut self, utterance_id: &UtteranceId, payload: String) -> Vec<RelayAction> {
        // Without a stream there is nowhere to play the audio.
        let Some(stream_id) = self.stream_id.clone() else {
            return Vec::new();
        };

        let mark = self
            .playback
            .record_chunk(utterance_id, self.latest_inbound_timestamp);
        self.stats.outbound_chunks += 1;

        vec![
            RelayAction::Telephony(TelephonyCommand::Media {
                stream_id: stream_id.clone(),
                payload,
            }),
            RelayAction::Telephony(TelephonyCommand::Mark {
                stream_id,
                name: mark,
            }),
        ]
    }

    /// Local call identifier
    pub const fn id(&self) -> CallId {
        self.id
    }

    /// Lifecycle state
    pub const fn state(&self) -> CallState {
        self.state
    }

    /// Speech engine connection state
    pub const fn engine_link(&self) -> EngineLink {
        self.engine
    }

    /// Whether the session reached its terminal state
    pub const fn is_closed(&self) -> bool {
        self.state.is_terminal()
    }

    /// Telephony stream identifier, once the stream started
    pub const fn stream_id(&self) -> Option<&StreamId> {
        self.stream_id.as_ref()
    }

    /// Latest inbound telephony timestamp in milliseconds
    pub const fn latest_inbound_timestamp(&self) -> u64 {
        self.latest_inbound_timestamp
    }

    /// Telephony timestamp at which the active utterance started playing
    pub fn active_response_start_timestamp(&self) -> Option<u64> {
        self.playback.active().map(|active| active.started_at_ms)
    }

    /// Utterance currently being played to the caller
    pub fn active_utterance_id(&self) -> Option<&UtteranceId> {
        self.playback.active().map(|active| &active.id)
    }

    /// Playback marks awaiting acknowledgment
    pub const fn playback(&self) -> &PlaybackMarkTracker {
        &self.playback
    }

    /// Number of playback marks awaiting acknowledgment
    pub fn pending_marks(&self) -> usize {
        self.playback.pending_len()
    }

    /// Counters collected so far
    pub const fn stats(&self) -> SessionStats {
        self.stats
    }
}

impl Default for CallSession {
    fn default() -> Self {
        Self::new()
    }
}
