//! Per-user quest progress schema
//!
//! One row per (user, quest) pair, created lazily on first progress. The
//! `completed` and `claimed` flags only ever transition false -> true.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for quest progress rows
pub const USER_QUEST_COLLECTION: &str = "user_quests";

/// Quest progress document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct QuestProgressDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata
    #[serde(default)]
    pub metadata: Metadata,

    /// Owning user
    pub user_id: ObjectId,

    /// Quest this row tracks
    pub quest_id: ObjectId,

    /// Accumulated progress toward the quest target
    #[serde(default)]
    pub progress_count: i64,

    /// Set once, when progress_count first reaches the target
    #[serde(default)]
    pub completed: bool,

    /// When the completion edge fired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime>,

    /// Set once, when the reward is claimed (legal only after completion)
    #[serde(default)]
    pub claimed: bool,
}

impl QuestProgressDoc {
    /// Create an empty progress row for a (user, quest) pair
    pub fn new(user_id: ObjectId, quest_id: ObjectId) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id,
            quest_id,
            progress_count: 0,
            completed: false,
            completed_at: None,
            claimed: false,
        }
    }
}

impl Default for QuestProgressDoc {
    fn default() -> Self {
        Self::new(ObjectId::new(), ObjectId::new())
    }
}

impl IntoIndexes for QuestProgressDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // One row per (user, quest); also serves the per-user listing
            (
                doc! { "user_id": 1, "quest_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_quest_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for QuestProgressDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
