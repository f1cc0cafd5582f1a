use crate::history::ring::EventRing;
use crate::history::PHRASE_RING_CAPACITY;
use crate::phrase::PhraseType;
use crate::time;

/// One phrase-change observation. Identity fields are fixed at creation;
/// the beat counter accumulates while the phrase is current.
#[derive(Debug, Clone, Copy)]
pub struct PhraseEvent {
    pub started_at_ms: i64,
    pub phrase: PhraseType,
    pub bpm_at_start: f64,
    beat_count: u32,
}

impl PhraseEvent {
    fn new(started_at_ms: i64, phrase: PhraseType, bpm_at_start: f64) -> Self {
        Self {
            started_at_ms,
            phrase,
            bpm_at_start,
            beat_count: 0,
        }
    }

    /// Beats observed while this phrase was current.
    pub fn beat_count(&self) -> u32 {
        self.beat_count
    }

    fn add_beat(&mut self) {
        self.beat_count += 1;
    }
}

/// Phrase history plus bookkeeping for runs of the same phrase type.
///
/// When the upstream announces the same phrase repeatedly (a long breakdown
/// read as DOWN, DOWN, DOWN), the run counters keep accumulating so callers
/// can tell how deep into the musical section they really are.
#[derive(Debug)]
pub struct PhraseTracker {
    events: EventRing<PhraseEvent>,
    repeat_count: u32,
    repeat_started_at_ms: i64,
    repeat_length_ms: i64,
    repeat_length_bars: f64,
}

impl PhraseTracker {
    pub fn new() -> Self {
        Self {
            events: EventRing::new(PHRASE_RING_CAPACITY),
            repeat_count: 0,
            repeat_started_at_ms: 0,
            repeat_length_ms: 0,
            repeat_length_bars: 0.0,
        }
    }

    /// Record a phrase change and report whether it repeats the previous
    /// phrase type. The first phrase ever logged is never a repeat.
    pub fn log_phrase(&mut self, at_ms: i64, phrase: PhraseType, bpm: f64) -> bool {
        let mut same = false;
        if let Some(prev) = self.events.newest() {
            if prev.phrase == phrase {
                same = true;
                let sub_len_ms = at_ms - prev.started_at_ms;
                let ms_per_beat = time::ms_per_beat(prev.bpm_at_start);
                self.repeat_count += 1;
                self.repeat_length_ms += sub_len_ms;
                self.repeat_length_bars += 0.25 / ms_per_beat * sub_len_ms as f64;
            }
        }
        if !same {
            self.repeat_count = 1;
            self.repeat_started_at_ms = at_ms;
            self.repeat_length_ms = 0;
            self.repeat_length_bars = 0.0;
        }
        self.events.add(PhraseEvent::new(at_ms, phrase, bpm));
        same
    }

    /// Count a beat against the current phrase, if there is one.
    pub fn note_beat(&mut self) {
        if let Some(current) = self.events.newest_mut() {
            current.add_beat();
        }
    }

    /// Bars covered by the current run of same-type phrases: completed
    /// repeats plus progress through the live phrase at its own tempo.
    /// Zero before any phrase has been logged.
    pub fn bar_progress(&self, now_ms: i64) -> f64 {
        let Some(current) = self.events.newest() else {
            return 0.0;
        };
        let ms_into_phrase = (now_ms - current.started_at_ms) as f64;
        self.repeat_length_bars + 0.25 / time::ms_per_beat(current.bpm_at_start) * ms_into_phrase
    }

    pub fn current(&self) -> Option<&PhraseEvent> {
        self.events.newest()
    }

    pub fn events(&self) -> &EventRing<PhraseEvent> {
        &self.events
    }

    /// Consecutive phrases of the current type, counting the live one.
    pub fn repeat_count(&self) -> u32 {
        self.repeat_count
    }

    /// When the current run of same-type phrases began.
    pub fn repeat_started_at_ms(&self) -> i64 {
        self.repeat_started_at_ms
    }

    /// Total length of the completed phrases in the current run.
    pub fn repeat_length_ms(&self) -> i64 {
        self.repeat_length_ms
    }

    /// Same, in bars at the tempo each phrase was logged with.
    pub fn repeat_length_bars(&self) -> f64 {
        self.repeat_length_bars
    }
}

impl Default for PhraseTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_phrase_is_never_a_repeat() {
        let mut tracker = PhraseTracker::new();
        assert!(!tracker.log_phrase(1000, PhraseType::Down, 120.0));
        assert_eq!(tracker.repeat_count(), 1);
    }

    #[test]
    fn same_type_extends_the_run() {
        let mut tracker = PhraseTracker::new();
        // 8 bars at 120 BPM = 16_000ms per phrase
        tracker.log_phrase(0, PhraseType::Down, 120.0);
        assert!(tracker.log_phrase(16_000, PhraseType::Down, 120.0));
        assert_eq!(tracker.repeat_count(), 2);
        assert_eq!(tracker.repeat_length_ms(), 16_000);
        assert!((tracker.repeat_length_bars() - 8.0).abs() < 1e-9);
        assert_eq!(tracker.repeat_started_at_ms(), 0);
    }

    #[test]
    fn different_type_resets_the_run() {
        let mut tracker = PhraseTracker::new();
        tracker.log_phrase(0, PhraseType::Down, 120.0);
        tracker.log_phrase(16_000, PhraseType::Down, 120.0);
        assert!(!tracker.log_phrase(32_000, PhraseType::Chorus, 120.0));
        assert_eq!(tracker.repeat_count(), 1);
        assert_eq!(tracker.repeat_length_ms(), 0);
        assert_eq!(tracker.repeat_length_bars(), 0.0);
        assert_eq!(tracker.repeat_started_at_ms(), 32_000);
    }

    #[test]
    fn bar_progress_tracks_the_live_phrase() {
        let mut tracker = PhraseTracker::new();
        tracker.log_phrase(0, PhraseType::Up, 120.0);
        // One bar at 120 BPM is 2000ms
        assert!((tracker.bar_progress(2000) - 1.0).abs() < 1e-9);
        assert!((tracker.bar_progress(5000) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn bar_progress_includes_completed_repeats() {
        let mut tracker = PhraseTracker::new();
        tracker.log_phrase(0, PhraseType::Down, 120.0);
        tracker.log_phrase(8000, PhraseType::Down, 120.0); // 4 bars done
        assert!((tracker.bar_progress(10_000) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn bar_progress_is_zero_without_phrases() {
        let tracker = PhraseTracker::new();
        assert_eq!(tracker.bar_progress(99_999), 0.0);
    }

    #[test]
    fn beats_count_against_the_current_phrase() {
        let mut tracker = PhraseTracker::new();
        tracker.note_beat(); // no phrase yet, ignored
        tracker.log_phrase(0, PhraseType::Up, 120.0);
        tracker.note_beat();
        tracker.note_beat();
        assert_eq!(tracker.current().map(|p| p.beat_count()), Some(2));

        tracker.log_phrase(16_000, PhraseType::Chorus, 120.0);
        assert_eq!(tracker.current().map(|p| p.beat_count()), Some(0));
    }

    #[test]
    fn run_length_uses_each_phrase_events_own_tempo() {
        let mut tracker = PhraseTracker::new();
        // Phrase logged at 100 BPM: one bar is 2400ms
        tracker.log_phrase(0, PhraseType::Down, 100.0);
        tracker.log_phrase(4800, PhraseType::Down, 150.0);
        // The completed sub-phrase is measured at its own 100 BPM
        assert!((tracker.repeat_length_bars() - 2.0).abs() < 1e-9);
        // Live progress now runs at the new phrase's 150 BPM (1600ms/bar)
        assert!((tracker.bar_progress(6400) - 3.0).abs() < 1e-9);
    }
}
