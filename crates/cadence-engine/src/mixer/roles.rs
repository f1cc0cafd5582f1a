//! The fixed channel roles inside the auto-VJ group.

use crate::phrase::PhraseType;

/// One lane of the auto-VJ mixer group.
///
/// Four roles mirror phrase types and carry the main look for that
/// phrase; `Strobes` and `Triggers` layer accents on top and are never
/// silenced by phrase switching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    Up,
    Down,
    Chorus,
    Strobes,
    Triggers,
    Tro,
}

impl ChannelRole {
    /// Every role, in lane order within the group.
    pub const ALL: [ChannelRole; 6] = [
        ChannelRole::Up,
        ChannelRole::Down,
        ChannelRole::Chorus,
        ChannelRole::Strobes,
        ChannelRole::Triggers,
        ChannelRole::Tro,
    ];

    /// Lane index within the group, matching [`Self::ALL`] order.
    pub fn index(self) -> usize {
        match self {
            ChannelRole::Up => 0,
            ChannelRole::Down => 1,
            ChannelRole::Chorus => 2,
            ChannelRole::Strobes => 3,
            ChannelRole::Triggers => 4,
            ChannelRole::Tro => 5,
        }
    }

    /// Channel label as it appears in the mixer.
    pub fn label(self) -> &'static str {
        match self {
            ChannelRole::Up => "UP",
            ChannelRole::Down => "DOWN",
            ChannelRole::Chorus => "CHORUS",
            ChannelRole::Strobes => "STROBES",
            ChannelRole::Triggers => "TRIGGERS",
            ChannelRole::Tro => "TRO",
        }
    }

    pub fn from_label(label: &str) -> Option<ChannelRole> {
        ChannelRole::ALL.into_iter().find(|role| role.label() == label)
    }

    /// The lane that carries the look for a phrase, if any.
    pub fn for_phrase(phrase: PhraseType) -> Option<ChannelRole> {
        match phrase {
            PhraseType::Tro => Some(ChannelRole::Tro),
            PhraseType::Up => Some(ChannelRole::Up),
            PhraseType::Down => Some(ChannelRole::Down),
            PhraseType::Chorus => Some(ChannelRole::Chorus),
            PhraseType::Unknown => None,
        }
    }

    /// Accent lanes keep whatever level their envelope left them at when
    /// the phrase switches.
    pub fn is_always_audible(self) -> bool {
        matches!(self, ChannelRole::Strobes | ChannelRole::Triggers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_in_lane_order() {
        for (i, role) in ChannelRole::ALL.into_iter().enumerate() {
            assert_eq!(role.index(), i);
        }
    }

    #[test]
    fn labels_round_trip() {
        for role in ChannelRole::ALL {
            assert_eq!(ChannelRole::from_label(role.label()), Some(role));
        }
        assert_eq!(ChannelRole::from_label("KARAOKE"), None);
    }

    #[test]
    fn phrase_lanes_map_one_to_one() {
        assert_eq!(ChannelRole::for_phrase(PhraseType::Chorus), Some(ChannelRole::Chorus));
        assert_eq!(ChannelRole::for_phrase(PhraseType::Tro), Some(ChannelRole::Tro));
        assert_eq!(ChannelRole::for_phrase(PhraseType::Unknown), None);
    }

    #[test]
    fn accent_lanes_are_always_audible() {
        assert!(ChannelRole::Strobes.is_always_audible());
        assert!(ChannelRole::Triggers.is_always_audible());
        assert!(!ChannelRole::Chorus.is_always_audible());
        assert!(!ChannelRole::Tro.is_always_audible());
    }
}
