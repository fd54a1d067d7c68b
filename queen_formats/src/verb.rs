use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Verb codes as stored in the command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    #[default]
    None,
    Open,
    Close,
    Move,
    Give,
    Use,
    PickUp,
    TalkTo,
    LookAt,
    WalkTo,
}

impl Verb {
    pub const PANEL: [Verb; 8] = [
        Verb::Open,
        Verb::Close,
        Verb::Move,
        Verb::Give,
        Verb::Use,
        Verb::PickUp,
        Verb::TalkTo,
        Verb::LookAt,
    ];

    pub fn from_code(code: i16) -> Result<Self> {
        Ok(match code {
            0 => Verb::None,
            1 => Verb::Open,
            2 => Verb::Close,
            3 => Verb::Move,
            5 => Verb::Give,
            6 => Verb::Use,
            7 => Verb::PickUp,
            8 => Verb::TalkTo,
            9 => Verb::LookAt,
            10 => Verb::WalkTo,
            other => bail!("unknown verb code {other}"),
        })
    }

    pub fn code(self) -> i16 {
        match self {
            Verb::None => 0,
            Verb::Open => 1,
            Verb::Close => 2,
            Verb::Move => 3,
            Verb::Give => 5,
            Verb::Use => 6,
            Verb::PickUp => 7,
            Verb::TalkTo => 8,
            Verb::LookAt => 9,
            Verb::WalkTo => 10,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Verb::None => "",
            Verb::Open => "Open",
            Verb::Close => "Close",
            Verb::Move => "Move",
            Verb::Give => "Give",
            Verb::Use => "Use",
            Verb::PickUp => "Pick up",
            Verb::TalkTo => "Talk to",
            Verb::LookAt => "Look at",
            Verb::WalkTo => "Walk to",
        }
    }

    /// Word joining the two subjects of a two-object command.
    pub fn link_word(self) -> Option<&'static str> {
        match self {
            Verb::Use => Some("with"),
            Verb::Give => Some("to"),
            _ => None,
        }
    }

    pub fn is_two_level(self) -> bool {
        self.link_word().is_some()
    }
}

/// Packed object/item state word.
///
/// Bit 8 is the on/open flag, bits 4..=7 hold the default verb and bit 10
/// marks an object that is used directly rather than on something else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectState(pub u16);

const ON_BIT: u16 = 1 << 8;
const USE_BIT: u16 = 1 << 10;
const VERB_SHIFT: u16 = 4;
const VERB_MASK: u16 = 0xF << VERB_SHIFT;

impl ObjectState {
    pub fn is_on(self) -> bool {
        self.0 & ON_BIT != 0
    }

    pub fn with_on(self, on: bool) -> Self {
        if on {
            ObjectState(self.0 | ON_BIT)
        } else {
            ObjectState(self.0 & !ON_BIT)
        }
    }

    pub fn uses_directly(self) -> bool {
        self.0 & USE_BIT != 0
    }

    pub fn default_verb(self) -> Verb {
        match (self.0 & VERB_MASK) >> VERB_SHIFT {
            1 => Verb::Open,
            3 => Verb::Close,
            6 => Verb::LookAt,
            7 => Verb::Move,
            8 => Verb::Give,
            9 => Verb::TalkTo,
            12 => Verb::Use,
            14 => Verb::PickUp,
            _ => Verb::None,
        }
    }

    pub fn with_default_verb(self, verb: Verb) -> Self {
        let code: u16 = match verb {
            Verb::Open => 1,
            Verb::Close => 3,
            Verb::LookAt => 6,
            Verb::Move => 7,
            Verb::Give => 8,
            Verb::TalkTo => 9,
            Verb::Use => 12,
            Verb::PickUp => 14,
            Verb::None | Verb::WalkTo => 0,
        };
        ObjectState((self.0 & !VERB_MASK) | (code << VERB_SHIFT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verb_codes_round_trip_for_panel() {
        for verb in Verb::PANEL {
            assert_eq!(Verb::from_code(verb.code()).unwrap(), verb);
        }
        assert!(Verb::from_code(4).is_err());
    }

    #[test]
    fn link_words_follow_verb() {
        assert_eq!(Verb::Use.link_word(), Some("with"));
        assert_eq!(Verb::Give.link_word(), Some("to"));
        assert_eq!(Verb::Open.link_word(), None);
    }

    #[test]
    fn state_bits_pack_independently() {
        let state = ObjectState(USE_BIT)
            .with_on(true)
            .with_default_verb(Verb::Close);
        assert!(state.is_on());
        assert!(state.uses_directly());
        assert_eq!(state.default_verb(), Verb::Close);

        let state = state.with_on(false).with_default_verb(Verb::Open);
        assert!(!state.is_on());
        assert!(state.uses_directly());
        assert_eq!(state.default_verb(), Verb::Open);
    }
}
