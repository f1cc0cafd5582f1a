use thiserror::Error;

/// Errors surfaced across the engine's public API.
#[derive(Error, Debug)]
pub enum AutopilotError {
    /// Positional read past the live window of an event ring.
    #[error("ring offset {offset} out of range (len {len})")]
    RingOffset { offset: usize, len: usize },

    /// Tempo estimate requested before any seed tempo was set.
    #[error("not tracking tempo yet")]
    NotTrackingTempo,

    /// Lookup referenced a deck outside the configured range.
    #[error("unknown deck {deck} (decks run 1..={num_decks})")]
    UnknownDeck { deck: i32, num_decks: i32 },
}

/// Result type for engine operations.
pub type AutopilotResult<T> = Result<T, AutopilotError>;
