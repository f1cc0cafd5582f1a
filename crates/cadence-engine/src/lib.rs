//! Beat/phrase-tracking autopilot for live VJ mixers.
//!
//! The engine consumes timestamped control events (beats, tempo reports,
//! phrase changes, deck faders), keeps rolling history to estimate tempo
//! and filter noise, and drives the fader levels of a dedicated channel
//! group inside a host mixer model.

pub mod autopilot;
pub mod config;
pub mod deck;
pub mod error;
pub mod events;
pub mod history;
pub mod mixer;
pub mod phrase;
pub mod time;

pub use autopilot::Autopilot;
pub use config::EngineConfig;
pub use error::{AutopilotError, AutopilotResult};
pub use history::Historian;
pub use phrase::PhraseType;
