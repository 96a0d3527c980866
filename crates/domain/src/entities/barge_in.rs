//! Barge-in (caller interruption) policy

use crate::entities::playback_tracker::PlaybackMarkTracker;
use crate::value_objects::UtteranceId;

/// Content part truncated on interruption; generated speech is a single part
pub const TRUNCATE_CONTENT_INDEX: u32 = 0;

/// Outcome of a barge-in that must cut the current utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interruption {
    /// Utterance to truncate
    pub utterance_id: UtteranceId,
    /// Audio the caller is estimated to have heard, in milliseconds
    pub audio_end_ms: u64,
    /// Telephony timestamp when the utterance started playing
    pub started_at_ms: u64,
    /// Telephony timestamp when the caller started speaking
    pub interrupted_at_ms: u64,
}

/// Decides whether caller speech interrupts the AI and by how much
///
/// The elapsed estimate uses the telephony clock only: the distance between
/// the latest inbound frame and the inbound frame that was current when the
/// utterance's first chunk went out. Network jitter between delivery and
/// actual playback is not accounted for.
#[derive(Debug, Clone, Copy, Default)]
pub struct BargeInController;

impl BargeInController {
    /// Create the controller
    pub const fn new() -> Self {
        Self
    }

    /// React to the engine detecting caller speech
    ///
    /// Returns `None` (and leaves the tracker untouched) unless an utterance
    /// is active and some of its audio is still unacknowledged. Otherwise
    /// resets the tracker and returns what must be truncated.
    ///
    /// The elapsed time saturates at zero, so a timestamp reset between the
    /// utterance start and the interruption never yields a negative cut.
    pub fn on_speech_started(
        &self,
        playback: &mut PlaybackMarkTracker,
        latest_inbound_ms: u64,
    ) -> Option<Interruption> {
        if !playback.has_pending() {
            return None;
        }
        let active = playback.active()?;

        let interruption = Interruption {
            utterance_id: active.id.clone(),
            audio_end_ms: latest_inbound_ms.saturating_sub(active.started_at_ms),
            started_at_ms: active.started_at_ms,
            interrupted_at_ms: latest_inbound_ms,
        };
        playback.reset();
        Some(interruption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utterance(id: &str) -> UtteranceId {
        UtteranceId::new(id).unwrap()
    }

    #[test]
    fn no_active_utterance_is_noop() {
        let mut playback = PlaybackMarkTracker::new();
        assert!(BargeInController::new().on_speech_started(&mut playback, 500).is_none());
    }

    #[test]
    fn fully_played_utterance_is_noop() {
        let mut playback = PlaybackMarkTracker::new();
        playback.record_chunk(&utterance("u1"), 100);
        playback.acknowledge();

        let result = BargeInController::new().on_speech_started(&mut playback, 900);

        assert!(result.is_none());
        assert!(playback.active().is_some());
    }

    #[test]
    fn interruption_computes_elapsed_and_resets() {
        let mut playback = PlaybackMarkTracker::new();
        playback.record_chunk(&utterance("u1"), 1000);
        playback.record_chunk(&utterance("u1"), 1200);

        let interruption = BargeInController::new()
            .on_speech_started(&mut playback, 1450)
            .unwrap();

        assert_eq!(interruption.utterance_id.as_str(), "u1");
        assert_eq!(interruption.audio_end_ms, 450);
        assert!(playback.active().is_none());
        assert_eq!(playback.pending_len(), 0);
    }

    #[test]
    fn elapsed_never_negative() {
        let mut playback = PlaybackMarkTracker::new();
        playback.record_chunk(&utterance("u1"), 1000);

        let interruption = BargeInController::new()
            .on_speech_started(&mut playback, 200)
            .unwrap();

        assert_eq!(interruption.audio_end_ms, 0);
    }

    #[test]
    fn second_speech_start_after_interruption_is_noop() {
        let mut playback = PlaybackMarkTracker::new();
        playback.record_chunk(&utterance("u1"), 0);
        let controller = BargeInController::new();

        assert!(controller.on_speech_started(&mut playback, 300).is_some());
        assert!(controller.on_speech_started(&mut playback, 320).is_none());
    }
}
