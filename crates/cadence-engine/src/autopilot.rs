//! The autopilot engine loop.
//!
//! Ties the subsystems together: drains decoded events, keeps beat and
//! phrase history, arbitrates decks, filters phrase noise, and drives the
//! auto-VJ group's faders with fade envelopes. The host calls [`Autopilot::tick`]
//! at frame rate with a wall clock in milliseconds; everything here is
//! synchronous and single-threaded.

use std::sync::{Arc, Mutex};

use crossbeam_channel::Receiver;

use crate::config::EngineConfig;
use crate::deck::DeckArbiter;
use crate::events::{EngineEvent, StampedEvent, TEMPO_DIFF_THRESHOLD};
use crate::history::Historian;
use crate::mixer::MixerOrchestrator;
use crate::mixer::model::MixerModel;
use crate::mixer::roles::ChannelRole;
use crate::mixer::template::TemplateStore;
use crate::phrase::PhraseType;
use crate::time;

/// No phrase events for this long while beats still flow: the DJ software
/// isn't sending phrases, so make our own on downbeats.
pub const PHRASE_TIMEOUT_MS: i64 = 120_000;
/// Nothing at all for this long: run fully self-clocked.
pub const EVENT_TIMEOUT_MS: i64 = 30_000;

const LEVEL_FULL: f64 = 1.0;
const LEVEL_PREV_FADE_FROM: f64 = 0.75;
const LEVEL_MISPREDICT_FADE_FROM: f64 = 0.75;
/// Asymptote for the anticipatory fade-in of the predicted next channel.
const LEVEL_FADE_IN_CEILING: f64 = 0.4;

const PREV_FADE_OUT_BARS: f64 = 2.0;
const MISPREDICT_FADE_OUT_BARS: f64 = 2.0;
const STROBES_FADE_OUT_BARS: f64 = 1.75;
const TRIGGERS_FADE_OUT_BARS: f64 = 1.5;
/// The predicted next channel creeps up over this many bars.
const FADE_IN_HORIZON_BARS: f64 = 16.0;

/// Phrase changes this soon after a deck handoff are switchover noise.
const MIN_BEATS_SINCE_DECK_CHANGE: f64 = 2.0;
/// Phrase changes this soon after the last one are glitches.
const MIN_BEATS_IN_PHRASE: f64 = 4.0;

pub struct Autopilot {
    config: EngineConfig,
    events_rx: Receiver<StampedEvent>,
    history: Historian,
    decks: DeckArbiter,
    mixer: MixerOrchestrator,

    enabled: bool,
    enabled_at_ms: i64,

    prev_phrase: PhraseType,
    cur_phrase: PhraseType,
    next_phrase: PhraseType,
    old_next_phrase: PhraseType,

    prev_fade_out_mode: bool,
    old_next_fade_out_mode: bool,
    /// Phrases stopped arriving but beats still do; phrasing on downbeats.
    beat_only_mode: bool,
    /// Everything stopped arriving; phrasing on the assumed tempo.
    no_event_mode: bool,

    /// Last level written by the next-channel fade-in, for continuity.
    next_fader_value: f64,
    /// Tempo currently applied to envelope math.
    current_bpm: f64,
}

impl Autopilot {
    pub fn new(
        config: EngineConfig,
        events_rx: Receiver<StampedEvent>,
        model: Arc<Mutex<MixerModel>>,
    ) -> Self {
        let templates = TemplateStore::new(config.template_path.clone());
        let history = Historian::new(config.tempo_error_adjust_range);
        let decks = DeckArbiter::new(config.num_decks);
        let mixer = MixerOrchestrator::new(model, templates);
        let current_bpm = config.default_bpm;
        Self {
            config,
            events_rx,
            history,
            decks,
            mixer,
            enabled: false,
            enabled_at_ms: 0,
            prev_phrase: PhraseType::Down,
            cur_phrase: PhraseType::Down,
            next_phrase: PhraseType::Up,
            old_next_phrase: PhraseType::Up,
            prev_fade_out_mode: false,
            old_next_fade_out_mode: false,
            beat_only_mode: false,
            no_event_mode: false,
            next_fader_value: 0.0,
            current_bpm,
        }
    }

    /// Turn the autopilot on or off. Enabling makes sure the mixer group
    /// exists and lights the current phrase channel.
    pub fn set_enabled(&mut self, enabled: bool, now_ms: i64) {
        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;
        if enabled {
            log::info!("Autopilot enabled");
            self.enabled_at_ms = now_ms;
            self.reset_phrase_state();
            self.mixer.ensure_setup();
            if let Some(role) = ChannelRole::for_phrase(self.cur_phrase) {
                self.mixer.set_fader_to(role, LEVEL_FULL);
            }
        } else {
            log::info!("Autopilot disabled");
        }
    }

    /// One pass of the engine loop.
    pub fn tick(&mut self, now_ms: i64) {
        let stamped: Vec<StampedEvent> = self.events_rx.try_iter().collect();
        for stamped in stamped {
            if !self.enabled {
                continue;
            }
            if now_ms - stamped.received_at_ms > self.config.event_max_age_ms {
                log::debug!("Dropping stale event {:?}", stamped.event);
                continue;
            }
            self.history.mark_event(stamped.received_at_ms);
            match stamped.event {
                EngineEvent::Beat { count } => self.on_beat(stamped.received_at_ms, count),
                EngineEvent::TempoChange { bpm } => self.on_tempo_change(bpm),
                EngineEvent::PhraseChange { phrase } => {
                    self.on_phrase_change(stamped.received_at_ms, phrase, false);
                }
                EngineEvent::DeckFader { deck, value } => {
                    self.on_deck_fader(stamped.received_at_ms, deck, value);
                }
            }
        }
        if !self.enabled {
            return;
        }

        self.mixer.ensure_setup();
        self.maybe_enter_no_event_mode(now_ms);
        self.update_tempo();
        self.update_fader_envelopes(now_ms);
    }

    // ---- Event routing ----

    fn on_beat(&mut self, at_ms: i64, count: i32) {
        self.history.log_beat(at_ms, count);
        if count == 0 {
            self.on_downbeat(at_ms);
        }
    }

    fn on_tempo_change(&mut self, bpm: f64) {
        if !time::is_valid_bpm(bpm) {
            log::warn!("Ignoring out-of-range tempo {bpm}");
            return;
        }
        if (bpm - self.current_bpm).abs() <= TEMPO_DIFF_THRESHOLD {
            return;
        }
        log::info!("Tempo set to {bpm:.2} BPM");
        self.current_bpm = bpm;
        self.history.reset_tempo_tracking(bpm);
    }

    fn on_deck_fader(&mut self, at_ms: i64, deck: i32, value: i32) {
        let before = self.decks.master_deck();
        let master = self.decks.update_fader_value(deck, value);
        if master > 0 && master != before {
            log::info!("Master deck is now {master}");
            self.history.log_master_deck_change(at_ms, master, value);
        }
    }

    fn on_phrase_change(&mut self, at_ms: i64, phrase: PhraseType, synthetic: bool) {
        if !synthetic {
            self.beat_only_mode = false;
            self.no_event_mode = false;

            // Deck switchovers and mid-phrase glitches masquerade as changes
            let beat_ms = time::ms_per_beat(self.current_bpm);
            if let Some(since) = self.history.ms_since_last_deck_change(at_ms) {
                if (since as f64) < beat_ms * MIN_BEATS_SINCE_DECK_CHANGE {
                    log::debug!("Dropping {phrase:?} phrase: deck changed {since}ms ago");
                    return;
                }
            }
            if let Some(since) = self.history.ms_since_last_phrase(at_ms) {
                if (since as f64) < beat_ms * MIN_BEATS_IN_PHRASE {
                    log::debug!("Dropping {phrase:?} phrase: last one was {since}ms ago");
                    return;
                }
            }
        }

        self.old_next_phrase = self.next_phrase;
        self.prev_phrase = self.cur_phrase;
        self.cur_phrase = phrase;
        self.next_phrase = phrase.guess_next();

        let predicted = self.old_next_phrase == phrase;
        let same = self.prev_phrase == phrase;

        self.prev_fade_out_mode = false;
        self.old_next_fade_out_mode = false;
        self.mixer.turn_down_all_channels(true);
        if !same {
            self.next_fader_value = 0.0;
            if predicted {
                // The lane we were ramping is now current; ease the old
                // look down instead of cutting it. Chorus entries cut hard.
                self.prev_fade_out_mode = matches!(phrase, PhraseType::Up | PhraseType::Down);
            } else {
                self.old_next_fade_out_mode = true;
            }
        }

        if let Some(role) = ChannelRole::for_phrase(phrase) {
            self.mixer.set_fader_to(role, LEVEL_FULL);
        }
        if phrase == PhraseType::Chorus {
            if !same {
                self.mixer.set_fader_to(ChannelRole::Strobes, LEVEL_FULL);
            }
            self.mixer.set_fader_to(ChannelRole::Triggers, LEVEL_FULL);
        }

        let repeated = self.history.log_phrase(at_ms, phrase, self.current_bpm);
        log::debug!(
            "Phrase {phrase:?} at {at_ms} (synthetic {synthetic}, repeat {repeated}, next {:?})",
            self.next_phrase
        );
    }

    // ---- Synthetic phrasing ----

    fn on_downbeat(&mut self, now_ms: i64) {
        if self.beat_only_mode {
            // Already self-phrasing; rotate when the phrase has run long
            let progress = self.history.phrase_tracker().bar_progress(now_ms);
            if f64::from(time::BARS_LONG_PHRASE) - progress < 1.0 {
                self.inject_synthetic_phrase(now_ms, self.next_phrase);
            }
            return;
        }
        let since_phrase = self
            .history
            .ms_since_last_phrase(now_ms)
            .unwrap_or(now_ms - self.enabled_at_ms);
        if since_phrase < PHRASE_TIMEOUT_MS {
            return;
        }
        log::warn!("No phrase events for {since_phrase}ms; entering beat-only mode");
        self.reset_phrase_state();
        self.beat_only_mode = true;
        self.inject_synthetic_phrase(now_ms, PhraseType::Down);
    }

    fn maybe_enter_no_event_mode(&mut self, now_ms: i64) {
        let since_event = self
            .history
            .ms_since_last_event(now_ms)
            .unwrap_or(now_ms - self.enabled_at_ms);
        if since_event <= EVENT_TIMEOUT_MS {
            self.no_event_mode = false;
            return;
        }
        if !self.no_event_mode {
            log::warn!("No events for {since_event}ms; running self-clocked");
            self.reset_phrase_state();
            self.no_event_mode = true;
            self.inject_synthetic_phrase(now_ms, PhraseType::Down);
            return;
        }
        // Keep phrases coming at the assumed tempo
        let cadence_ms = time::phrase_length_ms(self.current_bpm, time::BARS_LONG_PHRASE) as i64;
        let due = match self.history.last_synthetic_phrase_at() {
            Some(at) => now_ms - at >= cadence_ms,
            None => true,
        };
        if due {
            self.inject_synthetic_phrase(now_ms, self.cur_phrase.guess_next());
        }
    }

    fn inject_synthetic_phrase(&mut self, now_ms: i64, phrase: PhraseType) {
        log::debug!("Injecting synthetic {phrase:?} phrase");
        self.history.mark_synthetic_phrase(now_ms);
        self.on_phrase_change(now_ms, phrase, true);
    }

    fn reset_phrase_state(&mut self) {
        self.history.reset_phrase_tracking();
        self.prev_phrase = PhraseType::Down;
        self.cur_phrase = PhraseType::Down;
        self.next_phrase = PhraseType::Up;
        self.old_next_phrase = PhraseType::Up;
        self.prev_fade_out_mode = false;
        self.old_next_fade_out_mode = false;
        self.beat_only_mode = false;
        self.no_event_mode = false;
        self.next_fader_value = 0.0;
    }

    // ---- Tempo ----

    fn update_tempo(&mut self) {
        if !self.history.is_tracking_tempo() || !self.history.ready_for_tempo_estimation() {
            return;
        }
        let estimated = match self.history.estimate_bpm() {
            Ok(bpm) => bpm,
            Err(e) => {
                log::debug!("Tempo estimate unavailable: {e}");
                return;
            }
        };
        if (estimated - self.current_bpm).abs() > self.history.tempo_error_adjust_range() {
            log::info!(
                "Estimated {estimated:.2} BPM drifted from applied {:.2}; adjusting",
                self.current_bpm
            );
            self.current_bpm = estimated;
        }
    }

    // ---- Fader envelopes ----

    fn update_fader_envelopes(&mut self, now_ms: i64) {
        let Some(event) = self.history.current_phrase_event().copied() else {
            return;
        };
        let bars_elapsed =
            time::progress_to_future_bar(event.started_at_ms, now_ms, event.bpm_at_start, 1);

        self.update_next_channel_fade_in(bars_elapsed);

        if self.prev_fade_out_mode {
            let level = ramp_down(LEVEL_PREV_FADE_FROM, bars_elapsed, PREV_FADE_OUT_BARS);
            if let Some(role) = ChannelRole::for_phrase(self.prev_phrase) {
                self.mixer.set_fader_to(role, level);
            }
            if level <= 0.0 {
                self.prev_fade_out_mode = false;
            }
        }
        if self.old_next_fade_out_mode {
            let level =
                ramp_down(LEVEL_MISPREDICT_FADE_FROM, bars_elapsed, MISPREDICT_FADE_OUT_BARS);
            if let Some(role) = ChannelRole::for_phrase(self.old_next_phrase) {
                self.mixer.set_fader_to(role, level);
            }
            if level <= 0.0 {
                self.old_next_fade_out_mode = false;
            }
        }

        if self.cur_phrase == PhraseType::Chorus {
            // Strobes are keyed to the whole chorus run so a repeated
            // chorus continues the decay; triggers re-blast per chorus
            let run_bars = self.history.phrase_tracker().bar_progress(now_ms);
            self.mixer.set_fader_to(
                ChannelRole::Strobes,
                ramp_down(LEVEL_FULL, run_bars, STROBES_FADE_OUT_BARS),
            );
            self.mixer.set_fader_to(
                ChannelRole::Triggers,
                ramp_down(LEVEL_FULL, bars_elapsed, TRIGGERS_FADE_OUT_BARS),
            );
        }
    }

    /// Creep the predicted next channel up toward its ceiling.
    ///
    /// Each 16-bar stretch of the same phrase run halves the remaining
    /// headroom: 0.2 after one stretch, then 0.3, 0.35, toward 0.4. The
    /// floor never drops below what was already written, so repeats
    /// continue the creep instead of restarting it.
    fn update_next_channel_fade_in(&mut self, bars_elapsed: f64) {
        let Some(role) = ChannelRole::for_phrase(self.next_phrase) else {
            return;
        };
        let completed_bars = self.history.phrase_tracker().repeat_length_bars();
        let n = (completed_bars / FADE_IN_HORIZON_BARS) as i32 + 1;
        let floor = self.next_fader_value.min(fade_in_level(n - 1));
        let ceiling = fade_in_level(n);
        let progress = (bars_elapsed / FADE_IN_HORIZON_BARS).clamp(0.0, 1.0);
        let value = floor + (ceiling - floor) * progress.powf(1.5);
        self.next_fader_value = value;
        self.mixer.set_fader_to(role, value);
    }

    // ---- Accessors ----

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn current_bpm(&self) -> f64 {
        self.current_bpm
    }

    pub fn current_phrase(&self) -> PhraseType {
        self.cur_phrase
    }

    pub fn next_phrase(&self) -> PhraseType {
        self.next_phrase
    }

    pub fn is_beat_only_mode(&self) -> bool {
        self.beat_only_mode
    }

    pub fn is_no_event_mode(&self) -> bool {
        self.no_event_mode
    }

    pub fn history(&self) -> &Historian {
        &self.history
    }

    pub fn decks(&self) -> &DeckArbiter {
        &self.decks
    }

    pub fn mixer(&self) -> &MixerOrchestrator {
        &self.mixer
    }
}

fn ramp_down(from: f64, bars_elapsed: f64, over_bars: f64) -> f64 {
    (from * (1.0 - bars_elapsed / over_bars)).max(0.0)
}

/// Fade-in ceiling after `n` 16-bar stretches: `0.4 * (1 - 0.5^n)`.
fn fade_in_level(n: i32) -> f64 {
    LEVEL_FADE_IN_CEILING * (1.0 - 0.5_f64.powi(n))
}
