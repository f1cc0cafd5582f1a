//! Live tempo estimation from the beat-event history.

use crate::history::ring::EventRing;
use crate::history::BeatEvent;
use crate::time;

/// Fixed-alpha exponential moving average.
#[derive(Debug, Clone, Copy)]
pub struct Ema {
    alpha: f64,
    average: f64,
}

impl Ema {
    pub fn new(initial: f64, alpha: f64) -> Self {
        Self {
            alpha,
            average: initial,
        }
    }

    /// Fold a new sample into the average and return the result.
    pub fn update(&mut self, value: f64) -> f64 {
        self.average = self.alpha * value + (1.0 - self.alpha) * self.average;
        self.average
    }

    pub fn value(&self) -> f64 {
        self.average
    }
}

/// Estimate BPM from the beat ring, or `None` when no plausible beat gap
/// exists.
///
/// Walks the ring newest to oldest. Each gap is measured against a sliding
/// reference timestamp; gaps implying a tempo outside the plausible band
/// are skipped without advancing the reference, so a missed beat shows up
/// as one long (rejected) gap instead of poisoning its neighbors. The
/// surviving gaps are averaged with recency weighting and converted to BPM.
pub fn estimate_bpm(beats: &EventRing<BeatEvent>) -> Option<f64> {
    let newest = beats.newest()?;
    let mut reference = newest.at_ms;
    let mut remaining = beats.len();
    let mut gaps: Vec<f64> = Vec::new();

    for event in beats.iter() {
        if remaining == 0 {
            break;
        }
        let gap = (reference - event.at_ms) as f64;
        if !time::is_valid_beat_period(gap) {
            continue;
        }
        gaps.push(gap);
        reference = event.at_ms;
        remaining -= 1;
    }

    if gaps.is_empty() {
        return None;
    }
    Some(time::bpm_from_ms_per_beat(recency_weighted_mean(&gaps)))
}

/// Mean with linearly decaying weights: with n samples, the first (most
/// recent) counts n times as much as the last. Equals the plain mean for a
/// single sample.
pub fn recency_weighted_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len();
    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    for (i, value) in values.iter().enumerate() {
        let weight = (n - i) as f64;
        weighted_sum += weight * value;
        weight_sum += weight;
    }
    weighted_sum / weight_sum
}
