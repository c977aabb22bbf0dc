//! Gateway intent bits.

use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Set of event groups a bot-style session subscribes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Intents(u64);

impl Intents {
    pub const GUILDS: Intents = Intents(1 << 0);
    pub const GUILD_MEMBERS: Intents = Intents(1 << 1);
    pub const GUILD_BANS: Intents = Intents(1 << 2);
    pub const GUILD_EMOJIS: Intents = Intents(1 << 3);
    pub const GUILD_INTEGRATIONS: Intents = Intents(1 << 4);
    pub const GUILD_WEBHOOKS: Intents = Intents(1 << 5);
    pub const GUILD_INVITES: Intents = Intents(1 << 6);
    pub const GUILD_VOICE_STATES: Intents = Intents(1 << 7);
    pub const GUILD_PRESENCES: Intents = Intents(1 << 8);
    pub const GUILD_MESSAGES: Intents = Intents(1 << 9);
    pub const GUILD_MESSAGE_REACTIONS: Intents = Intents(1 << 10);
    pub const GUILD_MESSAGE_TYPING: Intents = Intents(1 << 11);
    pub const DIRECT_MESSAGES: Intents = Intents(1 << 12);
    pub const DIRECT_MESSAGE_REACTIONS: Intents = Intents(1 << 13);
    pub const DIRECT_MESSAGE_TYPING: Intents = Intents(1 << 14);
    pub const MESSAGE_CONTENT: Intents = Intents(1 << 15);
    pub const GUILD_SCHEDULED_EVENTS: Intents = Intents(1 << 16);

    /// Every intent bit, privileged ones included.
    pub const ALL: Intents = Intents(0x3FFFF);

    pub const fn empty() -> Self {
        Intents(0)
    }

    pub const fn from_bits(bits: u64) -> Self {
        Intents(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub fn combine(intents: impl IntoIterator<Item = Intents>) -> Self {
        intents.into_iter().fold(Intents::empty(), BitOr::bitor)
    }

    pub const fn contains(self, other: Intents) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Intents {
    type Output = Intents;

    fn bitor(self, rhs: Intents) -> Intents {
        Intents(self.0 | rhs.0)
    }
}

impl BitOrAssign for Intents {
    fn bitor_assign(&mut self, rhs: Intents) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_and_contains() {
        let intents = Intents::combine([Intents::GUILDS, Intents::GUILD_MESSAGES, Intents::MESSAGE_CONTENT]);
        assert_eq!(intents.bits(), 1 | 1 << 9 | 1 << 15);
        assert!(intents.contains(Intents::GUILD_MESSAGES));
        assert!(!intents.contains(Intents::DIRECT_MESSAGES));
        assert!(Intents::ALL.contains(intents));
        assert_eq!(Intents::combine([]), Intents::empty());
    }

    #[test]
    fn test_all_covers_every_flag() {
        let mut every = Intents::empty();
        for bit in 0..17 {
            every |= Intents::from_bits(1 << bit);
        }
        assert!(Intents::ALL.contains(every));
        assert_eq!(Intents::ALL.bits(), 262143);
        assert_eq!(serde_json::to_string(&Intents::GUILDS).unwrap(), "1");
    }
}
