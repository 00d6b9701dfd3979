//! Database schemas for the progression core
//!
//! Defines MongoDB document structures for users, quests, quest progress,
//! and event logs.

mod event_log;
mod metadata;
mod quest;
mod user;
mod user_quest;

pub use event_log::{EventLogDoc, EVENT_LOG_COLLECTION};
pub use metadata::Metadata;
pub use quest::{QuestCategory, QuestDoc, QUEST_COLLECTION};
pub use user::{UserProgressDoc, USER_COLLECTION};
pub use user_quest::{QuestProgressDoc, USER_QUEST_COLLECTION};
