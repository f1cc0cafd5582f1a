//! Simulation driver: plays a scripted DJ session through the engine.
//!
//! A feeder thread composes the OSC messages the DJ software would send,
//! decodes them with the same decoder a network receiver would use, and
//! pushes the stamped events over the channel. The main thread ticks the
//! autopilot at frame cadence and logs what it does with the faders.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::Sender;
use rosc::{OscMessage, OscType};

use cadence_engine::autopilot::Autopilot;
use cadence_engine::config::EngineConfig;
use cadence_engine::events::{self, StampedEvent};
use cadence_engine::mixer::model::MixerModel;
use cadence_engine::mixer::roles::ChannelRole;
use cadence_engine::phrase::PhraseType;

const TICK_MS: u64 = 50;
const RUN_TICKS: u64 = 900;

/// Scripted session tempo. Beats land every 480ms.
const SESSION_BPM: f64 = 125.0;
const BEAT_MS: i64 = 480;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = EngineConfig::load();
    let model = Arc::new(Mutex::new(MixerModel::new()));
    let (tx, rx) = crossbeam_channel::bounded(256);

    let started = Instant::now();
    let feeder = thread::Builder::new()
        .name("cadence-feed".into())
        .spawn(move || feed_session(&tx, started))?;

    let mut pilot = Autopilot::new(config, rx, model);
    pilot.set_enabled(true, 0);

    for tick in 0..RUN_TICKS {
        let now_ms = started.elapsed().as_millis() as i64;
        pilot.tick(now_ms);
        if tick % 100 == 0 {
            log_status(&pilot);
        }
        thread::sleep(Duration::from_millis(TICK_MS));
    }
    log_status(&pilot);

    // Hang up the channel so the feeder can't block on a full buffer
    drop(pilot);
    let _ = feeder.join();
    log::info!("Session complete");
    Ok(())
}

fn log_status(pilot: &Autopilot) {
    let faders: Vec<String> = ChannelRole::ALL
        .iter()
        .map(|role| {
            let level = pilot.mixer().fader_state(*role).map_or(0.0, |(level, _)| level);
            format!("{} {level:.2}", role.label())
        })
        .collect();
    log::info!(
        "{:.1} BPM, {:?} phrase, faders [{}]",
        pilot.current_bpm(),
        pilot.current_phrase(),
        faders.join(", ")
    );
}

fn feed_session(tx: &Sender<StampedEvent>, started: Instant) {
    for (at_ms, msg) in build_schedule() {
        let now_ms = started.elapsed().as_millis() as i64;
        if at_ms > now_ms {
            thread::sleep(Duration::from_millis((at_ms - now_ms) as u64));
        }
        let Some(event) = events::decode(&msg) else {
            log::warn!("Scripted message {} does not decode", msg.addr);
            continue;
        };
        let stamped = StampedEvent {
            event,
            received_at_ms: started.elapsed().as_millis() as i64,
        };
        if tx.send(stamped).is_err() {
            break;
        }
    }
    log::info!("Feed finished");
}

/// A 45-second set: tempo announcement, a steady beat grid, phrase
/// changes every eight bars, and a deck handoff with the switchover
/// glitch the engine is expected to filter.
fn build_schedule() -> Vec<(i64, OscMessage)> {
    let mut schedule = Vec::new();

    schedule.push((200, msg("/autovj/tempo/set", vec![OscType::Double(SESSION_BPM)])));
    schedule.push((400, msg("/autovj/mixer/fader/1", vec![OscType::Int(100)])));

    // Beat grid with 1-indexed beat-in-bar numbers, as sent on the wire
    let mut beat = 0;
    loop {
        let at = 500 + beat * BEAT_MS;
        if at >= 45_000 {
            break;
        }
        let number = (beat % 4) as i32 + 1;
        schedule.push((at, msg("/autovj/tempo/beat", vec![OscType::Int(number)])));
        beat += 1;
    }

    schedule.push((1_000, phrase(PhraseType::Up)));
    schedule.push((16_360, phrase(PhraseType::Chorus)));

    // Deck handoff, then a phrase announcement inside the switchover
    // window that the engine should drop
    schedule.push((24_000, msg("/autovj/mixer/fader/2", vec![OscType::Int(85)])));
    schedule.push((24_100, msg("/autovj/mixer/fader/1", vec![OscType::Int(5)])));
    schedule.push((24_500, phrase(PhraseType::Tro)));

    schedule.push((31_720, phrase(PhraseType::Down)));

    // The two-part tempo string some senders use instead of a float
    schedule.push((
        40_000,
        msg("/autovj/tempo/string/set", vec![OscType::String("125:30.0".into())]),
    ));

    schedule.sort_by_key(|(at, _)| *at);
    schedule
}

fn msg(addr: &str, args: Vec<OscType>) -> OscMessage {
    OscMessage {
        addr: addr.into(),
        args,
    }
}

fn phrase(phrase: PhraseType) -> OscMessage {
    msg(&events::phrase_change_address(phrase), Vec::new())
}
