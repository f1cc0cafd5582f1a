//! Event history and tempo tracking.
//!
//! The [`Historian`] owns every ring the engine looks back into: beat
//! timestamps, phrase changes, and master-deck handoffs. It is also where
//! the smoothed tempo estimate lives. All operations take explicit `now_ms`
//! timestamps so the whole module stays deterministic under test.

pub mod phrases;
pub mod ring;
pub mod tempo;

use crate::error::{AutopilotError, AutopilotResult};
use crate::phrase::PhraseType;
use phrases::{PhraseEvent, PhraseTracker};
use ring::EventRing;
use tempo::Ema;

/// Beat timestamps kept for tempo estimation.
pub const BEAT_RING_CAPACITY: usize = 128;
/// Phrase changes kept for structure tracking.
pub const PHRASE_RING_CAPACITY: usize = 32;
/// Master-deck handoffs kept for phrase-noise filtering.
pub const DECK_CHANGE_RING_CAPACITY: usize = 16;

/// Beat samples required before estimates are worth trusting.
pub const TEMPO_WARMUP_SAMPLES: usize = 16;
/// Smoothing factor for the tempo average.
const TEMPO_EMA_ALPHA: f64 = 0.2;

/// A beat pulse as delivered by the upstream tracker.
#[derive(Debug, Clone, Copy)]
pub struct BeatEvent {
    pub at_ms: i64,
}

/// A master-deck handoff observed by the arbiter.
#[derive(Debug, Clone, Copy)]
pub struct DeckChangeEvent {
    pub at_ms: i64,
    pub deck: i32,
    pub fader_value: i32,
}

/// Rolling record of everything the engine has heard.
pub struct Historian {
    beats: EventRing<BeatEvent>,
    phrases: PhraseTracker,
    deck_changes: EventRing<DeckChangeEvent>,
    tempo_ema: Option<Ema>,
    tempo_error_adjust_range: f64,
    last_beat_at: Option<i64>,
    last_downbeat_at: Option<i64>,
    last_phrase_at: Option<i64>,
    last_event_at: Option<i64>,
    last_synthetic_phrase_at: Option<i64>,
}

impl Historian {
    pub fn new(tempo_error_adjust_range: f64) -> Self {
        Self {
            beats: EventRing::new(BEAT_RING_CAPACITY),
            phrases: PhraseTracker::new(),
            deck_changes: EventRing::new(DECK_CHANGE_RING_CAPACITY),
            tempo_ema: None,
            tempo_error_adjust_range,
            last_beat_at: None,
            last_downbeat_at: None,
            last_phrase_at: None,
            last_event_at: None,
            last_synthetic_phrase_at: None,
        }
    }

    /// Record a beat. `beat_count` is the 0-indexed position within the
    /// bar; 0 marks a downbeat, negative means the tracker didn't say.
    pub fn log_beat(&mut self, at_ms: i64, beat_count: i32) {
        self.beats.add(BeatEvent { at_ms });
        self.last_beat_at = Some(at_ms);
        if beat_count == 0 {
            self.last_downbeat_at = Some(at_ms);
        }
        self.phrases.note_beat();
    }

    /// Record a phrase change. Returns whether it repeats the previous
    /// phrase type.
    pub fn log_phrase(&mut self, at_ms: i64, phrase: PhraseType, bpm: f64) -> bool {
        self.last_phrase_at = Some(at_ms);
        self.phrases.log_phrase(at_ms, phrase, bpm)
    }

    /// Record that the master deck changed.
    pub fn log_master_deck_change(&mut self, at_ms: i64, deck: i32, fader_value: i32) {
        self.deck_changes.add(DeckChangeEvent {
            at_ms,
            deck,
            fader_value,
        });
    }

    /// Note that any upstream event arrived, for liveness checks.
    pub fn mark_event(&mut self, at_ms: i64) {
        self.last_event_at = Some(at_ms);
    }

    /// Note that the engine injected a phrase of its own making.
    pub fn mark_synthetic_phrase(&mut self, at_ms: i64) {
        self.last_synthetic_phrase_at = Some(at_ms);
    }

    /// Smoothed BPM estimate folded over the current beat history.
    ///
    /// Runs the gap walk over the beat ring and feeds the result through
    /// the EMA. When the ring offers no plausible gap the previous smoothed
    /// value is returned unchanged; silence should not yank the tempo.
    pub fn estimate_bpm(&mut self) -> AutopilotResult<f64> {
        let Some(ema) = self.tempo_ema.as_mut() else {
            return Err(AutopilotError::NotTrackingTempo);
        };
        match tempo::estimate_bpm(&self.beats) {
            Some(raw) => Ok(ema.update(raw)),
            None => Ok(ema.value()),
        }
    }

    /// Last smoothed value without folding in a new estimate.
    pub fn current_bpm(&self) -> Option<f64> {
        self.tempo_ema.map(|ema| ema.value())
    }

    pub fn is_tracking_tempo(&self) -> bool {
        self.tempo_ema.is_some()
    }

    /// Whether enough beats have accumulated for estimates to mean much.
    pub fn ready_for_tempo_estimation(&self) -> bool {
        self.beats.len() >= TEMPO_WARMUP_SAMPLES
    }

    /// How far the applied tempo may drift from the estimate before the
    /// engine adopts the estimate.
    pub fn tempo_error_adjust_range(&self) -> f64 {
        self.tempo_error_adjust_range
    }

    /// Start (or restart) tempo tracking from a known-good seed.
    pub fn reset_tempo_tracking(&mut self, seed_bpm: f64) {
        self.tempo_ema = Some(Ema::new(seed_bpm, TEMPO_EMA_ALPHA));
    }

    /// Drop all beat history.
    pub fn reset_beat_tracking(&mut self) {
        self.beats = EventRing::new(BEAT_RING_CAPACITY);
        self.last_beat_at = None;
        self.last_downbeat_at = None;
    }

    /// Drop all phrase history, including repeat-run counters.
    pub fn reset_phrase_tracking(&mut self) {
        self.phrases = PhraseTracker::new();
        self.last_phrase_at = None;
        self.last_synthetic_phrase_at = None;
    }

    /// Drop the deck-change history.
    pub fn reset_deck_change_tracking(&mut self) {
        self.deck_changes = EventRing::new(DECK_CHANGE_RING_CAPACITY);
    }

    pub fn ms_since_last_beat(&self, now_ms: i64) -> Option<i64> {
        self.last_beat_at.map(|at| now_ms - at)
    }

    pub fn ms_since_last_downbeat(&self, now_ms: i64) -> Option<i64> {
        self.last_downbeat_at.map(|at| now_ms - at)
    }

    pub fn ms_since_last_phrase(&self, now_ms: i64) -> Option<i64> {
        self.last_phrase_at.map(|at| now_ms - at)
    }

    pub fn ms_since_last_event(&self, now_ms: i64) -> Option<i64> {
        self.last_event_at.map(|at| now_ms - at)
    }

    pub fn ms_since_last_deck_change(&self, now_ms: i64) -> Option<i64> {
        self.deck_changes.newest().map(|change| now_ms - change.at_ms)
    }

    pub fn last_synthetic_phrase_at(&self) -> Option<i64> {
        self.last_synthetic_phrase_at
    }

    pub fn current_phrase_event(&self) -> Option<&PhraseEvent> {
        self.phrases.current()
    }

    pub fn beats(&self) -> &EventRing<BeatEvent> {
        &self.beats
    }

    pub fn phrase_tracker(&self) -> &PhraseTracker {
        &self.phrases
    }

    pub fn deck_changes(&self) -> &EventRing<DeckChangeEvent> {
        &self.deck_changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn historian() -> Historian {
        Historian::new(1.0)
    }

    #[test]
    fn estimate_before_seeding_is_an_error() {
        let mut h = historian();
        assert!(matches!(
            h.estimate_bpm(),
            Err(AutopilotError::NotTrackingTempo)
        ));
        assert!(!h.is_tracking_tempo());
        assert!(h.current_bpm().is_none());
    }

    #[test]
    fn seeded_estimate_converges_on_steady_beats() {
        let mut h = historian();
        h.reset_tempo_tracking(100.0);
        // 120 BPM beat feed: 500ms gaps
        for i in 0..64 {
            h.log_beat(i * 500, (i % 4) as i32);
        }
        assert!(h.ready_for_tempo_estimation());
        let mut bpm = 0.0;
        for _ in 0..40 {
            bpm = h.estimate_bpm().unwrap();
        }
        assert!((bpm - 120.0).abs() < 1.0, "estimated {bpm}");
    }

    #[test]
    fn estimate_holds_previous_value_through_silence() {
        let mut h = historian();
        h.reset_tempo_tracking(128.0);
        // Two beats too close together to yield any plausible gap
        h.log_beat(0, 0);
        h.log_beat(50, 1);
        let bpm = h.estimate_bpm().unwrap();
        assert!((bpm - 128.0).abs() < 1e-9);
    }

    #[test]
    fn warmup_threshold_is_sixteen_beats() {
        let mut h = historian();
        for i in 0..15 {
            h.log_beat(i * 500, -1);
        }
        assert!(!h.ready_for_tempo_estimation());
        h.log_beat(15 * 500, -1);
        assert!(h.ready_for_tempo_estimation());
    }

    #[test]
    fn downbeats_are_stamped_separately() {
        let mut h = historian();
        h.log_beat(1000, 1);
        assert_eq!(h.ms_since_last_beat(1500), Some(500));
        assert_eq!(h.ms_since_last_downbeat(1500), None);
        h.log_beat(2000, 0);
        assert_eq!(h.ms_since_last_downbeat(2500), Some(500));
    }

    #[test]
    fn beats_count_into_the_current_phrase() {
        let mut h = historian();
        h.log_phrase(0, PhraseType::Up, 120.0);
        h.log_beat(500, 1);
        h.log_beat(1000, 2);
        assert_eq!(h.current_phrase_event().map(|p| p.beat_count()), Some(2));
    }

    #[test]
    fn deck_changes_roll_through_the_ring() {
        let mut h = historian();
        for i in 0..20 {
            h.log_master_deck_change(i * 100, (i % 4) as i32 + 1, 90);
        }
        assert_eq!(h.deck_changes().len(), DECK_CHANGE_RING_CAPACITY);
        assert_eq!(h.ms_since_last_deck_change(2000), Some(100));
    }

    #[test]
    fn resets_are_independent() {
        let mut h = historian();
        h.log_beat(0, 0);
        h.log_phrase(0, PhraseType::Down, 120.0);
        h.log_master_deck_change(0, 1, 127);

        h.reset_beat_tracking();
        assert!(h.beats().is_empty());
        assert!(h.ms_since_last_beat(100).is_none());
        assert_eq!(h.phrase_tracker().events().len(), 1);
        assert_eq!(h.deck_changes().len(), 1);

        h.reset_phrase_tracking();
        assert!(h.phrase_tracker().events().is_empty());
        assert_eq!(h.deck_changes().len(), 1);

        h.reset_deck_change_tracking();
        assert!(h.deck_changes().is_empty());
    }

    #[test]
    fn reseeding_replaces_the_average() {
        let mut h = historian();
        h.reset_tempo_tracking(120.0);
        h.reset_tempo_tracking(90.0);
        assert_eq!(h.current_bpm(), Some(90.0));
    }

    #[test]
    fn event_liveness_marks() {
        let mut h = historian();
        assert!(h.ms_since_last_event(1000).is_none());
        h.mark_event(1000);
        assert_eq!(h.ms_since_last_event(1500), Some(500));
        h.mark_synthetic_phrase(2000);
        assert_eq!(h.last_synthetic_phrase_at(), Some(2000));
    }
}
