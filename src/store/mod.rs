//! Store interfaces
//!
//! The engine's external collaborators as injectable traits: a user record
//! store, the quest catalog, the per-user quest progress store, and the
//! append-only event log. Every mutation a trait exposes is a single atomic
//! store interaction - a relative update (`record_event`, `raise_streak`,
//! `grant_reward`, `add_progress`) or a conditional one-way transition
//! (`mark_completed`, `claim`) - so the engine never does a non-atomic
//! read-then-write across the store boundary.

pub mod memory;
pub mod mongo;

use bson::{oid::ObjectId, DateTime};

use crate::db::schemas::{EventLogDoc, QuestCategory, QuestDoc, QuestProgressDoc, UserProgressDoc};
use crate::engine::progression::Rank;
use crate::types::Result;

pub use memory::{MemoryEventLog, MemoryQuestCatalog, MemoryQuestProgressStore, MemoryUserStore};
pub use mongo::{MongoEventLog, MongoQuestCatalog, MongoQuestProgressStore, MongoUserStore};

/// Leaderboard sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardMetric {
    Experience,
    Streak,
    Coins,
}

/// Field changes applied to a user record when an event is logged.
///
/// Applied as one atomic update: absolute sets for the derived fields,
/// increments for the counters, and a max for the longest streak.
#[derive(Debug, Clone)]
pub struct EventUpdate {
    /// Event timestamp; becomes `last_event_at`
    pub occurred_at: DateTime,
    /// Added to the experience total
    pub experience_gained: i64,
    /// Added to the coin balance
    pub coins_gained: i64,
    /// New cached level (derived from post-increment experience)
    pub new_level: i32,
    /// New cached rank (derived with the just-reset streak)
    pub new_rank: Rank,
    /// Streak length before the reset; folded into `longest_streak_days`
    pub previous_streak_days: i64,
    /// Post-increment monthly event count
    pub events_this_month: i64,
    /// Whether the monthly count crossed the premium threshold
    pub eligible_for_premium: bool,
}

/// Persistent per-user progression records.
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Read a user record by id
    async fn get(&self, user_id: &ObjectId) -> Result<Option<UserProgressDoc>>;

    /// Apply the logged-event update atomically: reset the streak, stamp the
    /// event time, set the derived level/rank, increment the counters, and
    /// raise `longest_streak_days` to the pre-reset streak if higher.
    async fn record_event(&self, user_id: &ObjectId, update: &EventUpdate) -> Result<()>;

    /// Raise the stored streak to `days` and fold it into the longest
    /// streak. Used by the lazy recompute on read; never lowers either field.
    async fn raise_streak(&self, user_id: &ObjectId, days: i64) -> Result<()>;

    /// Atomically add claimed quest rewards to the user's totals
    async fn grant_reward(&self, user_id: &ObjectId, experience: i64, coins: i64) -> Result<()>;

    /// Top users by the given metric, descending
    async fn top_by(&self, metric: LeaderboardMetric, limit: i64) -> Result<Vec<UserProgressDoc>>;
}

/// Read-only quest catalog.
#[async_trait::async_trait]
pub trait QuestCatalog: Send + Sync {
    /// Read a quest definition by id
    async fn get(&self, quest_id: &ObjectId) -> Result<Option<QuestDoc>>;

    /// All currently active quests
    async fn list_active(&self) -> Result<Vec<QuestDoc>>;

    /// Active quests tracking the given category
    async fn list_active_by_category(&self, category: QuestCategory) -> Result<Vec<QuestDoc>>;
}

/// Per-(user, quest) progress rows.
#[async_trait::async_trait]
pub trait QuestProgressStore: Send + Sync {
    /// Read a progress row
    async fn get(&self, user_id: &ObjectId, quest_id: &ObjectId)
        -> Result<Option<QuestProgressDoc>>;

    /// All progress rows for a user
    async fn list_for_user(&self, user_id: &ObjectId) -> Result<Vec<QuestProgressDoc>>;

    /// Upsert the row (created with zeroed counters if absent) and add
    /// `amount` to its progress count; returns the post-increment row.
    async fn add_progress(
        &self,
        user_id: &ObjectId,
        quest_id: &ObjectId,
        amount: i64,
    ) -> Result<QuestProgressDoc>;

    /// Fire the one-way completion transition. Conditional on the row not
    /// being completed yet; returns whether this call won the edge.
    async fn mark_completed(
        &self,
        user_id: &ObjectId,
        quest_id: &ObjectId,
        at: DateTime,
    ) -> Result<bool>;

    /// Fire the one-way claim transition. Conditional on `completed` being
    /// true and `claimed` false; returns whether this call won. At most one
    /// of two racing callers sees `true`.
    async fn claim(&self, user_id: &ObjectId, quest_id: &ObjectId) -> Result<bool>;
}

/// Append-only event log.
#[async_trait::async_trait]
pub trait EventLogStore: Send + Sync {
    /// Append a logged event
    async fn append(&self, entry: EventLogDoc) -> Result<ObjectId>;
}
