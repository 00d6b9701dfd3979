//! In-memory store implementations
//!
//! Used by the engine tests and for local development without a MongoDB.
//! The conditional transitions hold the write lock across their
//! check-and-set, giving the same at-most-once behavior the Mongo filters
//! provide.

use bson::{oid::ObjectId, DateTime};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::db::schemas::{EventLogDoc, Metadata, QuestCategory, QuestDoc, QuestProgressDoc, UserProgressDoc};
use crate::types::{EngineError, Result};

use super::{EventLogStore, EventUpdate, LeaderboardMetric, QuestCatalog, QuestProgressStore, UserStore};

/// In-memory user records
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<ObjectId, UserProgressDoc>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user record, assigning an id
    pub async fn insert(&self, mut user: UserProgressDoc) -> ObjectId {
        let id = ObjectId::new();
        user._id = Some(id);
        if user.metadata.created_at.is_none() {
            user.metadata = Metadata::new();
        }
        self.users.write().await.insert(id, user);
        id
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryUserStore {
    async fn get(&self, user_id: &ObjectId) -> Result<Option<UserProgressDoc>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn record_event(&self, user_id: &ObjectId, update: &EventUpdate) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| EngineError::NotFound(format!("User {} not found", user_id)))?;

        user.current_streak_days = 0;
        user.last_event_at = Some(update.occurred_at);
        user.level = update.new_level;
        user.rank = update.new_rank;
        user.events_this_month = update.events_this_month;
        user.eligible_for_premium = update.eligible_for_premium;
        user.experience += update.experience_gained;
        user.coins += update.coins_gained;
        user.longest_streak_days = user.longest_streak_days.max(update.previous_streak_days);
        user.metadata.updated_at = Some(DateTime::now());

        Ok(())
    }

    async fn raise_streak(&self, user_id: &ObjectId, days: i64) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| EngineError::NotFound(format!("User {} not found", user_id)))?;

        user.current_streak_days = days;
        user.longest_streak_days = user.longest_streak_days.max(days);
        user.metadata.updated_at = Some(DateTime::now());

        Ok(())
    }

    async fn grant_reward(&self, user_id: &ObjectId, experience: i64, coins: i64) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| EngineError::NotFound(format!("User {} not found", user_id)))?;

        user.experience += experience;
        user.coins += coins;
        user.metadata.updated_at = Some(DateTime::now());

        Ok(())
    }

    async fn top_by(&self, metric: LeaderboardMetric, limit: i64) -> Result<Vec<UserProgressDoc>> {
        let mut users: Vec<UserProgressDoc> = self.users.read().await.values().cloned().collect();

        users.sort_by_key(|u| {
            std::cmp::Reverse(match metric {
                LeaderboardMetric::Experience => u.experience,
                LeaderboardMetric::Streak => u.current_streak_days,
                LeaderboardMetric::Coins => u.coins,
            })
        });
        users.truncate(limit.max(0) as usize);

        Ok(users)
    }
}

/// In-memory quest catalog
#[derive(Default)]
pub struct MemoryQuestCatalog {
    quests: RwLock<HashMap<ObjectId, QuestDoc>>,
}

impl MemoryQuestCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a quest definition, assigning an id
    pub async fn insert(&self, mut quest: QuestDoc) -> ObjectId {
        let id = ObjectId::new();
        quest._id = Some(id);
        self.quests.write().await.insert(id, quest);
        id
    }
}

#[async_trait::async_trait]
impl QuestCatalog for MemoryQuestCatalog {
    async fn get(&self, quest_id: &ObjectId) -> Result<Option<QuestDoc>> {
        Ok(self.quests.read().await.get(quest_id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<QuestDoc>> {
        Ok(self
            .quests
            .read()
            .await
            .values()
            .filter(|q| q.active)
            .cloned()
            .collect())
    }

    async fn list_active_by_category(&self, category: QuestCategory) -> Result<Vec<QuestDoc>> {
        Ok(self
            .quests
            .read()
            .await
            .values()
            .filter(|q| q.active && q.category == category)
            .cloned()
            .collect())
    }
}

/// In-memory quest progress rows
#[derive(Default)]
pub struct MemoryQuestProgressStore {
    rows: RwLock<HashMap<(ObjectId, ObjectId), QuestProgressDoc>>,
}

impl MemoryQuestProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl QuestProgressStore for MemoryQuestProgressStore {
    async fn get(
        &self,
        user_id: &ObjectId,
        quest_id: &ObjectId,
    ) -> Result<Option<QuestProgressDoc>> {
        Ok(self.rows.read().await.get(&(*user_id, *quest_id)).cloned())
    }

    async fn list_for_user(&self, user_id: &ObjectId) -> Result<Vec<QuestProgressDoc>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|r| r.user_id == *user_id)
            .cloned()
            .collect())
    }

    async fn add_progress(
        &self,
        user_id: &ObjectId,
        quest_id: &ObjectId,
        amount: i64,
    ) -> Result<QuestProgressDoc> {
        let mut rows = self.rows.write().await;
        let row = rows.entry((*user_id, *quest_id)).or_insert_with(|| {
            let mut row = QuestProgressDoc::new(*user_id, *quest_id);
            row._id = Some(ObjectId::new());
            row
        });

        row.progress_count += amount;
        row.metadata.updated_at = Some(DateTime::now());

        Ok(row.clone())
    }

    async fn mark_completed(
        &self,
        user_id: &ObjectId,
        quest_id: &ObjectId,
        at: DateTime,
    ) -> Result<bool> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&(*user_id, *quest_id)) {
            Some(row) if !row.completed => {
                row.completed = true;
                row.completed_at = Some(at);
                row.metadata.updated_at = Some(DateTime::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn claim(&self, user_id: &ObjectId, quest_id: &ObjectId) -> Result<bool> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&(*user_id, *quest_id)) {
            Some(row) if row.completed && !row.claimed => {
                row.claimed = true;
                row.metadata.updated_at = Some(DateTime::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// In-memory event log
#[derive(Default)]
pub struct MemoryEventLog {
    entries: RwLock<Vec<EventLogDoc>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of logged entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the log is empty
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl EventLogStore for MemoryEventLog {
    async fn append(&self, mut entry: EventLogDoc) -> Result<ObjectId> {
        let id = ObjectId::new();
        entry._id = Some(id);
        self.entries.write().await.push(entry);
        Ok(id)
    }
}
