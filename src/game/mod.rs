//! Game rules: placeholder matching, fair player draws and command broadcasting.

pub mod broadcaster;
pub mod matcher;
pub mod numbers;
pub mod sampler;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use broadcaster::{BroadcastReport, CommandBroadcaster, RenderedCommand};
pub use matcher::{PlaceholderConfig, PlaceholderMatch, PlaceholderMatcher};
pub use sampler::SamplerError;

/// Gender bitmask of a player: 0 = none, 1 = female, 2 = male, 3 = both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Gender(u8);

impl Gender {
    /// No gender selected; such players only fill neutral placeholders.
    pub const NONE: Gender = Gender(0);
    /// Female bit.
    pub const FEMALE: Gender = Gender(1);
    /// Male bit.
    pub const MALE: Gender = Gender(2);
    /// Both bits set.
    pub const BOTH: Gender = Gender(3);

    /// Builds a gender from its stored value, dropping unknown bits.
    pub fn from_bits(bits: i64) -> Self {
        Gender((bits & 0b11) as u8)
    }

    /// Raw bitmask as stored in the database.
    pub fn bits(self) -> i64 {
        i64::from(self.0)
    }

    /// True if any bit of `other` is set in `self`.
    pub fn intersects(self, other: Gender) -> bool {
        self.0 & other.0 != 0
    }

    /// True for the female bit.
    pub fn is_female(self) -> bool {
        self.intersects(Gender::FEMALE)
    }

    /// True for the male bit.
    pub fn is_male(self) -> bool {
        self.intersects(Gender::MALE)
    }
}

/// Gender requirement of a placeholder slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderKind {
    /// Any player can fill the slot.
    Any,
    /// Only players with the female bit.
    Female,
    /// Only players with the male bit.
    Male,
}

impl PlaceholderKind {
    /// Whether a player of `gender` may fill this slot.
    pub fn accepts(self, gender: Gender) -> bool {
        match self {
            PlaceholderKind::Any => true,
            PlaceholderKind::Female => gender.is_female(),
            PlaceholderKind::Male => gender.is_male(),
        }
    }

    /// True for the gendered kinds, which are filled before neutral ones.
    pub fn is_gendered(self) -> bool {
        self != PlaceholderKind::Any
    }
}

/// Failures of a game round.
///
/// Every variant means the round could not be played without breaking an
/// invariant, so callers escalate instead of retrying.
#[derive(Debug, Error)]
pub enum GameError {
    /// The session store failed.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// The weighted draw detected broken accounting.
    #[error("sampler invariant violated: {0}")]
    Sampler(#[from] SamplerError),
}

impl GameError {
    /// Whether the process can no longer trust its state.
    pub fn is_fatal(&self) -> bool {
        match self {
            GameError::Storage(_) | GameError::Sampler(_) => true,
        }
    }
}
