//! MongoDB-backed store implementations
//!
//! Every write is a single update document so concurrent requests compose
//! through the database's atomicity: counters move with `$inc`, the longest
//! streak with `$max`, and the one-way quest transitions put their edge
//! condition in the filter so at most one caller can fire them.

use bson::{doc, oid::ObjectId, DateTime};
use mongodb::options::ReturnDocument;
use tracing::debug;

use crate::db::schemas::{
    EventLogDoc, QuestCategory, QuestDoc, QuestProgressDoc, UserProgressDoc, EVENT_LOG_COLLECTION,
    QUEST_COLLECTION, USER_COLLECTION, USER_QUEST_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::types::{EngineError, Result};

use super::{EventLogStore, EventUpdate, LeaderboardMetric, QuestCatalog, QuestProgressStore, UserStore};

/// User records in the `users` collection
#[derive(Clone)]
pub struct MongoUserStore {
    users: MongoCollection<UserProgressDoc>,
}

impl MongoUserStore {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            users: client.collection(USER_COLLECTION).await?,
        })
    }

    /// Insert a fresh user record (account creation path)
    pub async fn insert(&self, user: UserProgressDoc) -> Result<ObjectId> {
        self.users.insert_one(user).await
    }
}

#[async_trait::async_trait]
impl UserStore for MongoUserStore {
    async fn get(&self, user_id: &ObjectId) -> Result<Option<UserProgressDoc>> {
        self.users.find_one(doc! { "_id": user_id }).await
    }

    async fn record_event(&self, user_id: &ObjectId, update: &EventUpdate) -> Result<()> {
        let result = self
            .users
            .update_one(
                doc! { "_id": user_id },
                doc! {
                    "$set": {
                        "current_streak_days": 0_i64,
                        "last_event_at": update.occurred_at,
                        "level": update.new_level,
                        "rank": update.new_rank.to_string(),
                        "events_this_month": update.events_this_month,
                        "eligible_for_premium": update.eligible_for_premium,
                    },
                    "$inc": {
                        "experience": update.experience_gained,
                        "coins": update.coins_gained,
                    },
                    "$max": { "longest_streak_days": update.previous_streak_days },
                },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(EngineError::NotFound(format!("User {} not found", user_id)));
        }

        Ok(())
    }

    async fn raise_streak(&self, user_id: &ObjectId, days: i64) -> Result<()> {
        debug!(user = %user_id, days, "Persisting recomputed streak");

        let result = self
            .users
            .update_one(
                doc! { "_id": user_id },
                doc! {
                    "$set": { "current_streak_days": days },
                    "$max": { "longest_streak_days": days },
                },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(EngineError::NotFound(format!("User {} not found", user_id)));
        }

        Ok(())
    }

    async fn grant_reward(&self, user_id: &ObjectId, experience: i64, coins: i64) -> Result<()> {
        let result = self
            .users
            .update_one(
                doc! { "_id": user_id },
                doc! { "$inc": { "experience": experience, "coins": coins } },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(EngineError::NotFound(format!("User {} not found", user_id)));
        }

        Ok(())
    }

    async fn top_by(&self, metric: LeaderboardMetric, limit: i64) -> Result<Vec<UserProgressDoc>> {
        let sort_field = match metric {
            LeaderboardMetric::Experience => "experience",
            LeaderboardMetric::Streak => "current_streak_days",
            LeaderboardMetric::Coins => "coins",
        };

        self.users
            .find_sorted(doc! {}, Some(doc! { sort_field: -1 }), Some(limit))
            .await
    }
}

/// Quest definitions in the `quests` collection
#[derive(Clone)]
pub struct MongoQuestCatalog {
    quests: MongoCollection<QuestDoc>,
}

impl MongoQuestCatalog {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            quests: client.collection(QUEST_COLLECTION).await?,
        })
    }
}

#[async_trait::async_trait]
impl QuestCatalog for MongoQuestCatalog {
    async fn get(&self, quest_id: &ObjectId) -> Result<Option<QuestDoc>> {
        self.quests.find_one(doc! { "_id": quest_id }).await
    }

    async fn list_active(&self) -> Result<Vec<QuestDoc>> {
        self.quests.find_many(doc! { "active": true }).await
    }

    async fn list_active_by_category(&self, category: QuestCategory) -> Result<Vec<QuestDoc>> {
        self.quests
            .find_many(doc! { "category": category.to_string(), "active": true })
            .await
    }
}

/// Progress rows in the `user_quests` collection
#[derive(Clone)]
pub struct MongoQuestProgressStore {
    rows: MongoCollection<QuestProgressDoc>,
}

impl MongoQuestProgressStore {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            rows: client.collection(USER_QUEST_COLLECTION).await?,
        })
    }
}

#[async_trait::async_trait]
impl QuestProgressStore for MongoQuestProgressStore {
    async fn get(
        &self,
        user_id: &ObjectId,
        quest_id: &ObjectId,
    ) -> Result<Option<QuestProgressDoc>> {
        self.rows
            .find_one(doc! { "user_id": user_id, "quest_id": quest_id })
            .await
    }

    async fn list_for_user(&self, user_id: &ObjectId) -> Result<Vec<QuestProgressDoc>> {
        self.rows.find_many(doc! { "user_id": user_id }).await
    }

    async fn add_progress(
        &self,
        user_id: &ObjectId,
        quest_id: &ObjectId,
        amount: i64,
    ) -> Result<QuestProgressDoc> {
        let now = DateTime::now();

        // Upsert + $inc in one round trip, returning the post-increment row
        self.rows
            .inner()
            .find_one_and_update(
                doc! { "user_id": user_id, "quest_id": quest_id },
                doc! {
                    "$inc": { "progress_count": amount },
                    "$set": { "metadata.updated_at": now },
                    "$setOnInsert": {
                        "user_id": user_id,
                        "quest_id": quest_id,
                        "completed": false,
                        "claimed": false,
                        "metadata.created_at": now,
                    },
                },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| EngineError::Database(format!("Progress upsert failed: {}", e)))?
            .ok_or_else(|| EngineError::Database("Progress upsert returned no document".into()))
    }

    async fn mark_completed(
        &self,
        user_id: &ObjectId,
        quest_id: &ObjectId,
        at: DateTime,
    ) -> Result<bool> {
        // completed: false in the filter makes the edge fire at most once
        let result = self
            .rows
            .update_one(
                doc! { "user_id": user_id, "quest_id": quest_id, "completed": false },
                doc! { "$set": { "completed": true, "completed_at": at } },
            )
            .await?;

        Ok(result.modified_count == 1)
    }

    async fn claim(&self, user_id: &ObjectId, quest_id: &ObjectId) -> Result<bool> {
        // Check-and-set in one conditional update; a racing claimer loses
        let result = self
            .rows
            .update_one(
                doc! {
                    "user_id": user_id,
                    "quest_id": quest_id,
                    "completed": true,
                    "claimed": false,
                },
                doc! { "$set": { "claimed": true } },
            )
            .await?;

        Ok(result.modified_count == 1)
    }
}

/// Append-only event log in the `event_logs` collection
#[derive(Clone)]
pub struct MongoEventLog {
    entries: MongoCollection<EventLogDoc>,
}

impl MongoEventLog {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            entries: client.collection(EVENT_LOG_COLLECTION).await?,
        })
    }
}

#[async_trait::async_trait]
impl EventLogStore for MongoEventLog {
    async fn append(&self, entry: EventLogDoc) -> Result<ObjectId> {
        self.entries.insert_one(entry).await
    }
}
