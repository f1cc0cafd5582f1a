//! Master-deck arbitration.
//!
//! Phrase changes only matter when they come from the deck the audience
//! hears. The arbiter watches per-deck fader values and nominates the
//! loudest deck as master; ties keep the lower-numbered deck so a DJ
//! riding two faders at the same level doesn't flap the master.

use std::collections::HashMap;

use crate::error::{AutopilotError, AutopilotResult};

pub const DEFAULT_NUM_DECKS: i32 = 4;

/// Tracks deck fader levels and the current master deck.
///
/// Decks are numbered `1..=num_decks`. Fader values are raw controller
/// integers; only their relative order matters here.
pub struct DeckArbiter {
    faders: HashMap<i32, i32>,
    master_deck: i32,
    num_decks: i32,
}

impl DeckArbiter {
    pub fn new(num_decks: i32) -> Self {
        let mut faders = HashMap::new();
        for deck in 1..=num_decks {
            faders.insert(deck, 0);
        }
        Self {
            faders,
            master_deck: 1,
            num_decks,
        }
    }

    /// Apply a fader move and return the master deck afterwards.
    ///
    /// Unknown decks are rejected without touching any state and signalled
    /// with -1 so callers can tell "no master" apart from a real deck.
    pub fn update_fader_value(&mut self, deck: i32, value: i32) -> i32 {
        if deck < 1 || deck > self.num_decks {
            log::warn!("Ignoring fader for unknown deck {deck} (decks run 1..={})", self.num_decks);
            return -1;
        }
        self.faders.insert(deck, value);

        // Highest fader wins; scanning upward with a strict comparison
        // keeps the lower-numbered deck on ties.
        let mut loudest_deck = 0;
        let mut loudest_value = 0;
        for candidate in 1..=self.num_decks {
            let value = self.faders.get(&candidate).copied().unwrap_or(0);
            if value > loudest_value {
                loudest_deck = candidate;
                loudest_value = value;
            }
        }
        if loudest_deck > 0 {
            self.master_deck = loudest_deck;
        }
        self.master_deck
    }

    pub fn master_deck(&self) -> i32 {
        self.master_deck
    }

    pub fn fader_value(&self, deck: i32) -> AutopilotResult<i32> {
        self.faders
            .get(&deck)
            .copied()
            .ok_or(AutopilotError::UnknownDeck {
                deck,
                num_decks: self.num_decks,
            })
    }

    pub fn num_decks(&self) -> i32 {
        self.num_decks
    }
}

impl Default for DeckArbiter {
    fn default() -> Self {
        Self::new(DEFAULT_NUM_DECKS)
    }
}
