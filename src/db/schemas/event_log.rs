//! Event log schema
//!
//! Append-only record of every logged event, with the optional mood and
//! trigger annotations the tracker captures.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::{Metadata, QuestCategory};

/// Collection name for event logs
pub const EVENT_LOG_COLLECTION: &str = "event_logs";

/// Logged event stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EventLogDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata
    #[serde(default)]
    pub metadata: Metadata,

    /// User who logged the event
    pub user_id: ObjectId,

    /// Event category
    pub category: QuestCategory,

    /// When the event occurred (caller-supplied)
    pub occurred_at: DateTime,

    /// Self-reported mood at the time of the event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,

    /// Self-reported triggers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<String>,
}

impl Default for EventLogDoc {
    fn default() -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            user_id: ObjectId::new(),
            category: QuestCategory::default(),
            occurred_at: DateTime::from_millis(0),
            mood: None,
            triggers: Vec::new(),
        }
    }
}

impl IntoIndexes for EventLogDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Per-user history, newest first
            (
                doc! { "user_id": 1, "occurred_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("user_occurred".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for EventLogDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
