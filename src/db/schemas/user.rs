//! User progression document schema
//!
//! One document per user, holding the experience/level/rank counters and
//! streak state the engine maintains.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::engine::progression::Rank;

/// Collection name for user progression records
pub const USER_COLLECTION: &str = "users";

/// User progression document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserProgressDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at doubles as the account creation instant)
    #[serde(default)]
    pub metadata: Metadata,

    /// Display name
    pub name: String,

    /// Accumulated experience points
    #[serde(default)]
    pub experience: i64,

    /// Cached level, derived from experience on every write
    #[serde(default = "default_level")]
    pub level: i32,

    /// Cached rank, derived from level and streak on every write
    #[serde(default)]
    pub rank: Rank,

    /// Whole days since the last tracked event (recomputed lazily on read)
    #[serde(default)]
    pub current_streak_days: i64,

    /// Historical maximum streak; never decreases
    #[serde(default)]
    pub longest_streak_days: i64,

    /// When the last event was logged, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event_at: Option<DateTime>,

    /// Spendable currency balance
    #[serde(default)]
    pub coins: i64,

    /// Events logged in the current calendar month
    #[serde(default)]
    pub events_this_month: i64,

    /// Whether the monthly event count has crossed the premium threshold
    #[serde(default)]
    pub eligible_for_premium: bool,
}

fn default_level() -> i32 {
    1
}

impl UserProgressDoc {
    /// Create a fresh record with all counters zeroed
    pub fn new(name: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            name,
            experience: 0,
            level: 1,
            rank: Rank::Rookie,
            current_streak_days: 0,
            longest_streak_days: 0,
            last_event_at: None,
            coins: 0,
            events_this_month: 0,
            eligible_for_premium: false,
        }
    }
}

impl IntoIndexes for UserProgressDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Leaderboard sorts
            (
                doc! { "experience": -1 },
                Some(
                    IndexOptions::builder()
                        .name("experience_desc".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "current_streak_days": -1 },
                Some(
                    IndexOptions::builder()
                        .name("streak_desc".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserProgressDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
