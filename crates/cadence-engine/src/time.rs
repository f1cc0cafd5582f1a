//! Beat and bar arithmetic shared across the engine.

pub const BEATS_PER_BAR: i32 = 4;
pub const MS_PER_MINUTE: f64 = 60_000.0;

/// Plausibility bounds for live tempo. Exclusive on both ends.
pub const MIN_BPM: f64 = 50.0;
pub const MAX_BPM: f64 = 200.0;

/// Common phrase lengths in dance music, in bars.
pub const BARS_SHORT_PHRASE: i32 = 8;
pub const BARS_MEDIUM_PHRASE: i32 = 16;
pub const BARS_LONG_PHRASE: i32 = 32;

pub fn is_valid_bpm(bpm: f64) -> bool {
    bpm > MIN_BPM && bpm < MAX_BPM
}

/// Whether a beat-to-beat gap implies a plausible tempo.
pub fn is_valid_beat_period(gap_ms: f64) -> bool {
    is_valid_bpm(bpm_from_ms_per_beat(gap_ms))
}

pub fn ms_per_beat(bpm: f64) -> f64 {
    MS_PER_MINUTE / bpm
}

pub fn bpm_from_ms_per_beat(gap_ms: f64) -> f64 {
    MS_PER_MINUTE / gap_ms
}

/// Duration of `bars` bars at `bpm`, in ms.
pub fn phrase_length_ms(bpm: f64, bars: i32) -> f64 {
    ms_per_beat(bpm) * f64::from(BEATS_PER_BAR) * f64::from(bars)
}

/// Fraction of the way from `started_at_ms` to a point `bars` bars later.
/// Exceeds 1.0 once `now_ms` passes that point.
pub fn progress_to_future_bar(started_at_ms: i64, now_ms: i64, bpm: f64, bars: i32) -> f64 {
    (now_ms - started_at_ms) as f64 / phrase_length_ms(bpm, bars)
}

/// Midpoint guess for when an event actually happened, given that it was
/// observed at `now_ms` on a loop polling every `sample_interval_ms`.
pub fn estimated_event_start_ms(now_ms: i64, sample_interval_ms: i64) -> i64 {
    now_ms - sample_interval_ms / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ms_per_beat_at_120() {
        assert!((ms_per_beat(120.0) - 500.0).abs() < 1e-9);
    }

    #[test]
    fn bpm_round_trip() {
        let bpm = 174.0;
        assert!((bpm_from_ms_per_beat(ms_per_beat(bpm)) - bpm).abs() < 1e-9);
    }

    #[test]
    fn bpm_bounds_are_exclusive() {
        assert!(!is_valid_bpm(50.0));
        assert!(!is_valid_bpm(200.0));
        assert!(is_valid_bpm(50.1));
        assert!(is_valid_bpm(199.9));
        assert!(!is_valid_bpm(0.0));
        assert!(!is_valid_bpm(-128.0));
    }

    #[test]
    fn beat_period_bounds() {
        // 300ms is exactly 200 BPM, which the exclusive bound rejects
        assert!(!is_valid_beat_period(300.0));
        assert!(is_valid_beat_period(301.0));
        // 1200ms is exactly 50 BPM
        assert!(!is_valid_beat_period(1200.0));
        assert!(is_valid_beat_period(1199.0));
        assert!(!is_valid_beat_period(0.0));
    }

    #[test]
    fn phrase_length_at_120() {
        // 500ms per beat, 4 beats per bar, 32 bars
        assert!((phrase_length_ms(120.0, BARS_LONG_PHRASE) - 64_000.0).abs() < 1e-9);
    }

    #[test]
    fn progress_to_future_bar_midpoint() {
        // Half of one bar at 120 BPM (2000ms per bar)
        let p = progress_to_future_bar(0, 1000, 120.0, 1);
        assert!((p - 0.5).abs() < 1e-9);
    }

    #[test]
    fn progress_can_exceed_one() {
        let p = progress_to_future_bar(0, 5000, 120.0, 1);
        assert!(p > 1.0);
    }

    #[test]
    fn estimated_event_start_splits_interval() {
        assert_eq!(estimated_event_start_ms(10_000, 50), 9_975);
    }
}
