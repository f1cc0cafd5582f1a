use serde::{Deserialize, Serialize};

/// Musical phrase classes announced by the upstream tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhraseType {
    /// Intro/outro material.
    Tro,
    /// Build-up.
    Up,
    /// Breakdown.
    Down,
    Chorus,
    /// Anything the upstream labels that we don't recognize.
    Unknown,
}

impl PhraseType {
    pub const ALL: &[PhraseType] = &[
        PhraseType::Tro,
        PhraseType::Up,
        PhraseType::Down,
        PhraseType::Chorus,
        PhraseType::Unknown,
    ];

    /// Parse a phrase label, case-insensitively. Unrecognized labels map to
    /// `Unknown` rather than failing; the upstream vocabulary grows faster
    /// than ours.
    pub fn resolve(label: &str) -> PhraseType {
        match label.to_ascii_lowercase().as_str() {
            "tro" => PhraseType::Tro,
            "up" => PhraseType::Up,
            "down" => PhraseType::Down,
            "chorus" => PhraseType::Chorus,
            _ => PhraseType::Unknown,
        }
    }

    /// Resolve the final segment of a slash-delimited address.
    pub fn from_address(addr: &str) -> PhraseType {
        PhraseType::resolve(addr.rsplit('/').next().unwrap_or(""))
    }

    /// Lowercase wire label.
    pub fn label(&self) -> &'static str {
        match self {
            PhraseType::Tro => "tro",
            PhraseType::Up => "up",
            PhraseType::Down => "down",
            PhraseType::Chorus => "chorus",
            PhraseType::Unknown => "unknown",
        }
    }

    /// Most likely phrase to follow this one in dance-music structure.
    pub fn guess_next(&self) -> PhraseType {
        match self {
            PhraseType::Tro => PhraseType::Up,
            PhraseType::Up => PhraseType::Chorus,
            PhraseType::Down => PhraseType::Up,
            PhraseType::Chorus => PhraseType::Down,
            PhraseType::Unknown => PhraseType::Down,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_known_labels() {
        assert_eq!(PhraseType::resolve("tro"), PhraseType::Tro);
        assert_eq!(PhraseType::resolve("up"), PhraseType::Up);
        assert_eq!(PhraseType::resolve("down"), PhraseType::Down);
        assert_eq!(PhraseType::resolve("chorus"), PhraseType::Chorus);
    }

    #[test]
    fn resolve_is_case_insensitive() {
        assert_eq!(PhraseType::resolve("CHORUS"), PhraseType::Chorus);
        assert_eq!(PhraseType::resolve("Down"), PhraseType::Down);
    }

    #[test]
    fn resolve_unrecognized_is_unknown() {
        assert_eq!(PhraseType::resolve("bridge"), PhraseType::Unknown);
        assert_eq!(PhraseType::resolve(""), PhraseType::Unknown);
    }

    #[test]
    fn from_address_takes_last_segment() {
        assert_eq!(
            PhraseType::from_address("/autovj/phrase/chorus"),
            PhraseType::Chorus
        );
        assert_eq!(PhraseType::from_address("up"), PhraseType::Up);
    }

    #[test]
    fn guess_next_walks_song_structure() {
        assert_eq!(PhraseType::Tro.guess_next(), PhraseType::Up);
        assert_eq!(PhraseType::Up.guess_next(), PhraseType::Chorus);
        assert_eq!(PhraseType::Down.guess_next(), PhraseType::Up);
        assert_eq!(PhraseType::Chorus.guess_next(), PhraseType::Down);
        assert_eq!(PhraseType::Unknown.guess_next(), PhraseType::Down);
    }

    #[test]
    fn labels_round_trip_through_resolve() {
        for phrase in PhraseType::ALL {
            assert_eq!(PhraseType::resolve(phrase.label()), *phrase);
        }
    }
}
