//! Playback mark tracking
//!
//! Telephony transports do not report the exact playback position of audio
//! we send. Instead, a mark is queued after every forwarded chunk and the
//! transport echoes it back once the caller's device played everything up to
//! it. The number of unacknowledged marks tells whether the caller is still
//! hearing the current utterance.

use std::collections::VecDeque;

use crate::value_objects::{MarkName, UtteranceId};

/// The utterance currently being played to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveUtterance {
    /// Utterance identifier on the speech engine side
    pub id: UtteranceId,
    /// Latest inbound telephony timestamp when its first chunk was forwarded
    pub started_at_ms: u64,
}

/// Tracks the active utterance and the FIFO of unacknowledged marks
#[derive(Debug, Clone, Default)]
pub struct PlaybackMarkTracker {
    active: Option<ActiveUtterance>,
    pending: VecDeque<MarkName>,
    next_sequence: u64,
}

impl PlaybackMarkTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one forwarded audio chunk
    ///
    /// Starts a new active utterance when none is active or the chunk belongs
    /// to a different utterance, then queues and returns the mark that must
    /// be sent right after the chunk.
    pub fn record_chunk(&mut self, utterance_id: &UtteranceId, latest_inbound_ms: u64) -> MarkName {
        let is_new_utterance = self
            .active
            .as_ref()
            .is_none_or(|active| &active.id != utterance_id);

        if is_new_utterance {
            self.active = Some(ActiveUtterance {
                id: utterance_id.clone(),
                started_at_ms: latest_inbound_ms,
            });
        }

        self.next_sequence += 1;
        let mark = MarkName::response_part(self.next_sequence);
        self.pending.push_back(mark.clone());
        mark
    }

    /// Consume the oldest pending mark; `None` when nothing was pending
    pub fn acknowledge(&mut self) -> Option<MarkName> {
        self.pending.pop_front()
    }

    /// Forget the active utterance and every pending mark
    pub fn reset(&mut self) {
        self.active = None;
        self.pending.clear();
    }

    /// The utterance currently in flight, if any
    pub const fn active(&self) -> Option<&ActiveUtterance> {
        self.active.as_ref()
    }

    /// Number of marks sent but not yet acknowledged
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether any sent audio may still be unplayed
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Pending marks in emission order
    pub fn pending(&self) -> impl Iterator<Item = &MarkName> {
        self.pending.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utterance(id: &str) -> UtteranceId {
        UtteranceId::new(id).unwrap()
    }

    #[test]
    fn first_chunk_starts_utterance() {
        let mut tracker = PlaybackMarkTracker::new();
        tracker.record_chunk(&utterance("u1"), 40);

        let active = tracker.active().unwrap();
        assert_eq!(active.id.as_str(), "u1");
        assert_eq!(active.started_at_ms, 40);
        assert_eq!(tracker.pending_len(), 1);
    }

    #[test]
    fn later_chunks_keep_start_timestamp() {
        let mut tracker = PlaybackMarkTracker::new();
        tracker.record_chunk(&utterance("u1"), 40);
        tracker.record_chunk(&utterance("u1"), 200);

        assert_eq!(tracker.active().unwrap().started_at_ms, 40);
        assert_eq!(tracker.pending_len(), 2);
    }

    #[test]
    fn new_utterance_restarts_timestamp() {
        let mut tracker = PlaybackMarkTracker::new();
        tracker.record_chunk(&utterance("u1"), 40);
        tracker.acknowledge();
        tracker.record_chunk(&utterance("u2"), 900);

        let active = tracker.active().unwrap();
        assert_eq!(active.id.as_str(), "u2");
        assert_eq!(active.started_at_ms, 900);
    }

    #[test]
    fn acknowledge_is_fifo() {
        let mut tracker = PlaybackMarkTracker::new();
        let first = tracker.record_chunk(&utterance("u1"), 0);
        let second = tracker.record_chunk(&utterance("u1"), 0);

        assert_eq!(tracker.acknowledge(), Some(first));
        assert_eq!(tracker.acknowledge(), Some(second));
        assert_eq!(tracker.acknowledge(), None);
    }

    #[test]
    fn reset_clears_everything() {
        let mut tracker = PlaybackMarkTracker::new();
        tracker.record_chunk(&utterance("u1"), 10);
        tracker.reset();

        assert!(tracker.active().is_none());
        assert!(!tracker.has_pending());
    }

    #[test]
    fn mark_names_stay_unique_across_resets() {
        let mut tracker = PlaybackMarkTracker::new();
        let before = tracker.record_chunk(&utterance("u1"), 0);
        tracker.reset();
        let after = tracker.record_chunk(&utterance("u2"), 0);
        assert_ne!(before, after);
    }
}
