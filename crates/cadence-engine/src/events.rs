//! Decoding of incoming control events.
//!
//! The DJ side announces tempo, beats, phrases, and deck fader moves over
//! OSC. This module turns those messages into [`EngineEvent`]s; transport
//! and threading live with the caller.

use rosc::{OscMessage, OscType};

use crate::phrase::PhraseType;

/// Namespace all autopilot addresses live under.
pub const ADDRESS_PREFIX: &str = "/autovj";

/// Tempo moves smaller than this are jitter, not a new tempo.
pub const TEMPO_DIFF_THRESHOLD: f64 = 0.05;

/// A decoded control event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    /// A beat pulse. `count` is the 0-indexed beat within the bar, or -1
    /// when the sender didn't say.
    Beat { count: i32 },
    /// The DJ software reported a new tempo.
    TempoChange { bpm: f64 },
    /// The master deck entered a new phrase.
    PhraseChange { phrase: PhraseType },
    /// A deck fader moved. `value` is the raw controller level.
    DeckFader { deck: i32, value: i32 },
}

/// An event stamped with its receipt time.
#[derive(Debug, Clone, Copy)]
pub struct StampedEvent {
    pub event: EngineEvent,
    pub received_at_ms: i64,
}

/// Decode one OSC message into an engine event.
pub fn decode(msg: &OscMessage) -> Option<EngineEvent> {
    let addr = &msg.addr;
    let parts: Vec<&str> = addr.split('/').collect();
    // parts[0] is always "" (leading slash)

    // All our addresses start with /autovj/
    if parts.len() < 3 || parts[1] != "autovj" {
        return None;
    }

    match parts[2] {
        // /autovj/tempo/set          float BPM
        // /autovj/tempo/string/set   "whole:frac*100", e.g. "123:62.4"
        // /autovj/tempo/beat         1-indexed beat within the bar
        "tempo" if parts.len() >= 4 => match parts[3] {
            "set" => {
                let bpm = first_float(&msg.args)?;
                Some(EngineEvent::TempoChange { bpm })
            }
            "string" if parts.len() >= 5 && parts[4] == "set" => {
                let bpm = parse_two_part_bpm(first_string(&msg.args)?)?;
                Some(EngineEvent::TempoChange { bpm })
            }
            "beat" => {
                let count = first_int(&msg.args).map_or(-1, |n| n - 1);
                Some(EngineEvent::Beat { count })
            }
            _ => None,
        },

        // /autovj/phrase/{label}
        "phrase" if parts.len() >= 4 => Some(EngineEvent::PhraseChange {
            phrase: PhraseType::from_address(addr),
        }),

        // /autovj/mixer/fader/{deck}
        "mixer" if parts.len() >= 5 && parts[3] == "fader" => {
            let deck: i32 = parts[4].parse().ok()?;
            let value = first_int(&msg.args)?;
            Some(EngineEvent::DeckFader { deck, value })
        }

        _ => None,
    }
}

/// Address a phrase change for `phrase` would arrive on.
pub fn phrase_change_address(phrase: PhraseType) -> String {
    format!("{ADDRESS_PREFIX}/phrase/{}", phrase.label())
}

/// Extract the first float-ish value from OSC args.
fn first_float(args: &[OscType]) -> Option<f64> {
    args.first().and_then(|a| match a {
        OscType::Float(f) => Some(f64::from(*f)),
        OscType::Double(d) => Some(*d),
        OscType::Int(i) => Some(f64::from(*i)),
        OscType::Long(l) => Some(*l as f64),
        _ => None,
    })
}

fn first_int(args: &[OscType]) -> Option<i32> {
    args.first().and_then(|a| match a {
        OscType::Int(i) => Some(*i),
        OscType::Long(l) => Some(*l as i32),
        OscType::Float(f) => Some(*f as i32),
        OscType::Double(d) => Some(*d as i32),
        _ => None,
    })
}

fn first_string(args: &[OscType]) -> Option<&str> {
    args.first().and_then(|a| match a {
        OscType::String(s) => Some(s.as_str()),
        _ => None,
    })
}

/// Parse the two-part tempo encoding `"whole:frac*100"`.
///
/// `"123:62.4"` is 123 BPM plus 62.4 hundredths of a BPM, so 123.624.
fn parse_two_part_bpm(raw: &str) -> Option<f64> {
    let (whole, frac) = raw.split_once(':')?;
    let whole: f64 = whole.trim().parse().ok()?;
    let frac: f64 = frac.trim().parse().ok()?;
    Some(whole + frac / 100.0)
}
