//! Quest definition schema
//!
//! Quest documents are seeded administratively and immutable once published;
//! the engine only reads them.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for quest definitions
pub const QUEST_COLLECTION: &str = "quests";

/// Event category a quest tracks
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum QuestCategory {
    /// A tracked relapse event ("fap" in legacy catalog documents)
    #[default]
    #[serde(alias = "fap")]
    Relapse,
    /// A daily mood check-in
    Mood,
    /// A streak milestone
    Streak,
}

impl fmt::Display for QuestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relapse => write!(f, "relapse"),
            Self::Mood => write!(f, "mood"),
            Self::Streak => write!(f, "streak"),
        }
    }
}

/// Quest definition stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct QuestDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata
    #[serde(default)]
    pub metadata: Metadata,

    /// Short quest title
    pub title: String,

    /// Longer description shown to the user
    #[serde(default)]
    pub description: String,

    /// Event category this quest counts
    pub category: QuestCategory,

    /// Progress count required for completion
    pub target_count: i64,

    /// Experience granted when the reward is claimed
    #[serde(default)]
    pub experience_reward: i64,

    /// Whether the quest currently accrues progress
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl IntoIndexes for QuestDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // applyProgress lists active quests per category
            (
                doc! { "category": 1, "active": 1 },
                Some(
                    IndexOptions::builder()
                        .name("category_active".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for QuestDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&QuestCategory::Relapse).unwrap(),
            "\"relapse\""
        );
        assert_eq!(
            serde_json::to_string(&QuestCategory::Mood).unwrap(),
            "\"mood\""
        );
    }

    #[test]
    fn test_category_accepts_legacy_spelling() {
        // Catalog documents seeded by the original app use "fap"
        let category: QuestCategory = serde_json::from_str("\"fap\"").unwrap();
        assert_eq!(category, QuestCategory::Relapse);
        let category: QuestCategory = serde_json::from_str("\"relapse\"").unwrap();
        assert_eq!(category, QuestCategory::Relapse);
    }

    #[test]
    fn test_quest_deserializes_with_defaults() {
        let quest: QuestDoc = serde_json::from_str(
            r#"{"title": "First Steps", "category": "fap", "target_count": 1}"#,
        )
        .unwrap();
        assert!(quest.active);
        assert_eq!(quest.experience_reward, 0);
        assert_eq!(quest.category, QuestCategory::Relapse);
    }
}
