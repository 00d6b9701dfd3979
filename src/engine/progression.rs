//! Level and rank math
//!
//! Pure functions: accumulated experience maps to a level, and the
//! (level, streak) pair maps onto a fixed rank ladder. No state, no I/O.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Experience required per level
pub const EXPERIENCE_PER_LEVEL: i64 = 100;

/// Rank tiers, lowest to highest
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum Rank {
    #[default]
    Rookie,
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
    Legend,
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rookie => "Rookie",
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Platinum => "Platinum",
            Self::Diamond => "Diamond",
            Self::Legend => "Legend",
        };
        write!(f, "{}", name)
    }
}

/// Threshold ladder, highest tier first. Both minimums on a row must be met.
const RANK_LADDER: [(Rank, i32, i64); 6] = [
    (Rank::Legend, 50, 100),
    (Rank::Diamond, 30, 50),
    (Rank::Platinum, 20, 30),
    (Rank::Gold, 15, 14),
    (Rank::Silver, 10, 7),
    (Rank::Bronze, 5, 3),
];

/// Level for an accumulated experience total.
///
/// Experience is non-negative by caller contract; every 100 XP is one level,
/// starting at level 1.
pub fn level_from_experience(experience: i64) -> i32 {
    (experience / EXPERIENCE_PER_LEVEL) as i32 + 1
}

/// Experience total at which the next level is reached.
pub fn experience_for_next_level(experience: i64) -> i64 {
    level_from_experience(experience) as i64 * EXPERIENCE_PER_LEVEL
}

/// Rank for a (level, streak) pair.
///
/// Evaluated top-down so a user qualifying for several tiers gets the
/// highest; falls through to Rookie when no row matches.
pub fn rank_for(level: i32, streak_days: i64) -> Rank {
    for (rank, min_level, min_streak) in RANK_LADDER {
        if level >= min_level && streak_days >= min_streak {
            return rank;
        }
    }
    Rank::Rookie
}
