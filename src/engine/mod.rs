//! Progression engine
//!
//! Turns logged events into updated experience, level, rank, and streak
//! state, and drives quest progress and reward claiming. The engine is
//! request-scoped and stateless: all durable state sits behind the injected
//! store traits, and every mutation it issues is a single atomic store
//! interaction.

pub mod progression;
pub mod streak;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::db::schemas::{EventLogDoc, QuestCategory, QuestDoc, UserProgressDoc};
use crate::store::{
    EventLogStore, EventUpdate, LeaderboardMetric, QuestCatalog, QuestProgressStore, UserStore,
};
use crate::types::{EngineError, Result};

use progression::Rank;

/// Engine tunables, defaulting to the production values
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Experience granted for logging an event
    pub event_experience: i64,
    /// Coins granted for logging an event
    pub event_coins: i64,
    /// Divisor applied to a quest's experience reward to derive its coin
    /// grant (floor division)
    pub claim_coin_divisor: i64,
    /// Events-per-month threshold for premium eligibility
    pub premium_event_threshold: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_experience: 10,
            event_coins: 1,
            claim_coin_divisor: 10,
            premium_event_threshold: 100,
        }
    }
}

/// Caller-supplied annotations for a logged event
#[derive(Debug, Clone, Default)]
pub struct EventMetadata {
    /// Self-reported mood
    pub mood: Option<String>,
    /// Self-reported triggers
    pub triggers: Vec<String>,
}

/// Result of logging an event
#[derive(Debug, Clone, Serialize)]
pub struct EventOutcome {
    pub experience_gained: i64,
    pub leveled_up: bool,
    pub new_level: i32,
    pub new_rank: Rank,
    pub eligible_for_premium: bool,
}

/// Point-in-time view of a user's progression
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    pub level: i32,
    pub rank: Rank,
    pub current_streak_days: i64,
    pub longest_streak_days: i64,
    pub experience: i64,
    pub experience_for_next_level: i64,
    pub coins: i64,
}

/// Quest definition joined with the user's progress row
#[derive(Debug, Clone, Serialize)]
pub struct QuestWithProgress {
    pub quest: QuestDoc,
    pub progress_count: i64,
    pub completed: bool,
    pub claimed: bool,
}

/// Amounts granted by a successful claim
#[derive(Debug, Clone, Serialize)]
pub struct ClaimedReward {
    pub experience_awarded: i64,
    pub currency_awarded: i64,
}

/// One leaderboard row
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub level: i32,
    pub rank: Rank,
    pub experience: i64,
    pub current_streak_days: i64,
    pub coins: i64,
}

impl From<&UserProgressDoc> for LeaderboardEntry {
    fn from(user: &UserProgressDoc) -> Self {
        Self {
            name: user.name.clone(),
            level: user.level,
            rank: user.rank,
            experience: user.experience,
            current_streak_days: user.current_streak_days,
            coins: user.coins,
        }
    }
}

/// Top users by streak, experience, and coins
#[derive(Debug, Clone, Serialize)]
pub struct Leaderboard {
    pub top_streaks: Vec<LeaderboardEntry>,
    pub top_experience: Vec<LeaderboardEntry>,
    pub top_coins: Vec<LeaderboardEntry>,
}

/// The progression engine, generic over its store collaborators
pub struct HabitEngine<U, C, P, L>
where
    U: UserStore,
    C: QuestCatalog,
    P: QuestProgressStore,
    L: EventLogStore,
{
    users: Arc<U>,
    catalog: Arc<C>,
    progress: Arc<P>,
    events: Arc<L>,
    config: EngineConfig,
}

impl<U, C, P, L> HabitEngine<U, C, P, L>
where
    U: UserStore,
    C: QuestCatalog,
    P: QuestProgressStore,
    L: EventLogStore,
{
    pub fn new(
        users: Arc<U>,
        catalog: Arc<C>,
        progress: Arc<P>,
        events: Arc<L>,
        config: EngineConfig,
    ) -> Self {
        Self {
            users,
            catalog,
            progress,
            events,
            config,
        }
    }

    /// Log one tracked event for a user.
    ///
    /// Appends the event to the log, grants the event experience/coins,
    /// resets the streak (folding the pre-reset length into the longest
    /// streak), refreshes the cached level and rank, and advances quest
    /// progress for the event's category.
    pub async fn log_event(
        &self,
        user_id: &ObjectId,
        category: QuestCategory,
        now: DateTime<Utc>,
        metadata: EventMetadata,
    ) -> Result<EventOutcome> {
        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("User {} not found", user_id)))?;

        let occurred_at = bson::DateTime::from_chrono(now);

        self.events
            .append(EventLogDoc {
                _id: None,
                metadata: Default::default(),
                user_id: *user_id,
                category,
                occurred_at,
                mood: metadata.mood,
                triggers: metadata.triggers,
            })
            .await?;

        let new_experience = user.experience + self.config.event_experience;
        let new_level = progression::level_from_experience(new_experience);
        // The streak is zero the instant the event lands
        let new_rank = progression::rank_for(new_level, 0);

        let events_this_month = user.events_this_month + 1;
        let eligible_for_premium = events_this_month >= self.config.premium_event_threshold;

        // The stored streak lags the clock between reads; fold in the live
        // length so an unread streak still counts toward the record
        let previous_streak_days = user
            .current_streak_days
            .max(streak::current_streak_days(&user, now));

        self.users
            .record_event(
                user_id,
                &EventUpdate {
                    occurred_at,
                    experience_gained: self.config.event_experience,
                    coins_gained: self.config.event_coins,
                    new_level,
                    new_rank,
                    previous_streak_days,
                    events_this_month,
                    eligible_for_premium,
                },
            )
            .await?;

        self.apply_progress(user_id, category, 1).await?;

        info!(
            user = %user_id,
            %category,
            level = new_level,
            "Event logged"
        );

        Ok(EventOutcome {
            experience_gained: self.config.event_experience,
            leveled_up: new_level > user.level,
            new_level,
            new_rank,
            eligible_for_premium,
        })
    }

    /// Advance progress on every active quest of a category.
    ///
    /// Returns the ids of quests whose completion edge fired on this call.
    /// The edge is a conditional transition in the store, so repeated
    /// over-target increments never re-fire it.
    pub async fn apply_progress(
        &self,
        user_id: &ObjectId,
        category: QuestCategory,
        amount: i64,
    ) -> Result<Vec<ObjectId>> {
        if amount <= 0 {
            return Err(EngineError::InvalidState(format!(
                "Progress amount must be positive, got {}",
                amount
            )));
        }

        let mut newly_completed = Vec::new();

        for quest in self.catalog.list_active_by_category(category).await? {
            let Some(quest_id) = quest._id else {
                continue;
            };

            let row = self.progress.add_progress(user_id, &quest_id, amount).await?;

            if !row.completed && row.progress_count >= quest.target_count {
                let fired = self
                    .progress
                    .mark_completed(user_id, &quest_id, bson::DateTime::now())
                    .await?;
                if fired {
                    debug!(user = %user_id, quest = %quest_id, "Quest completed");
                    newly_completed.push(quest_id);
                }
            }
        }

        Ok(newly_completed)
    }

    /// Current progression snapshot, with the lazy streak recompute.
    ///
    /// Recomputes whole days since the last event (or account creation) and
    /// persists the value when it exceeds the stored streak; calling twice
    /// with the same `now` leaves identical stored state. The reported rank
    /// is derived fresh from the level and the recomputed streak.
    pub async fn get_progress(
        &self,
        user_id: &ObjectId,
        now: DateTime<Utc>,
    ) -> Result<ProgressSnapshot> {
        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("User {} not found", user_id)))?;

        let recomputed = streak::current_streak_days(&user, now);

        let (current_streak_days, longest_streak_days) = if recomputed > user.current_streak_days {
            self.users.raise_streak(user_id, recomputed).await?;
            (recomputed, user.longest_streak_days.max(recomputed))
        } else {
            (user.current_streak_days, user.longest_streak_days)
        };

        Ok(ProgressSnapshot {
            level: user.level,
            rank: progression::rank_for(user.level, current_streak_days),
            current_streak_days,
            longest_streak_days,
            experience: user.experience,
            experience_for_next_level: progression::experience_for_next_level(user.experience),
            coins: user.coins,
        })
    }

    /// Active quests joined with the user's progress rows.
    ///
    /// Quests the user never progressed read as zero progress.
    pub async fn list_quests_with_progress(
        &self,
        user_id: &ObjectId,
    ) -> Result<Vec<QuestWithProgress>> {
        let quests = self.catalog.list_active().await?;
        let rows = self.progress.list_for_user(user_id).await?;

        let by_quest: HashMap<ObjectId, _> =
            rows.into_iter().map(|row| (row.quest_id, row)).collect();

        Ok(quests
            .into_iter()
            .map(|quest| {
                let row = quest._id.and_then(|id| by_quest.get(&id));
                QuestWithProgress {
                    progress_count: row.map(|r| r.progress_count).unwrap_or(0),
                    completed: row.map(|r| r.completed).unwrap_or(false),
                    claimed: row.map(|r| r.claimed).unwrap_or(false),
                    quest,
                }
            })
            .collect())
    }

    /// Claim a completed quest's reward exactly once.
    ///
    /// The claim transition is a conditional check-and-set against the
    /// store; of two racing claimers one wins and the other gets `Conflict`.
    /// Coins are the experience reward floor-divided by the configured
    /// divisor.
    pub async fn claim_quest(
        &self,
        user_id: &ObjectId,
        quest_id: &ObjectId,
    ) -> Result<ClaimedReward> {
        let quest = self
            .catalog
            .get(quest_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Quest {} not found", quest_id)))?;

        let row = self
            .progress
            .get(user_id, quest_id)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!(
                    "No progress for user {} on quest {}",
                    user_id, quest_id
                ))
            })?;

        if !row.completed {
            return Err(EngineError::InvalidState("Quest not completed".into()));
        }
        if row.claimed {
            return Err(EngineError::InvalidState("Quest already claimed".into()));
        }

        if !self.progress.claim(user_id, quest_id).await? {
            return Err(EngineError::Conflict(
                "Quest was claimed concurrently".into(),
            ));
        }

        let currency_awarded = quest.experience_reward / self.config.claim_coin_divisor;
        self.users
            .grant_reward(user_id, quest.experience_reward, currency_awarded)
            .await?;

        info!(
            user = %user_id,
            quest = %quest_id,
            experience = quest.experience_reward,
            coins = currency_awarded,
            "Quest reward claimed"
        );

        Ok(ClaimedReward {
            experience_awarded: quest.experience_reward,
            currency_awarded,
        })
    }

    /// Top users by streak, experience, and coins.
    pub async fn leaderboard(&self, limit: i64) -> Result<Leaderboard> {
        let top_streaks = self.users.top_by(LeaderboardMetric::Streak, limit).await?;
        let top_experience = self
            .users
            .top_by(LeaderboardMetric::Experience, limit)
            .await?;
        let top_coins = self.users.top_by(LeaderboardMetric::Coins, limit).await?;

        Ok(Leaderboard {
            top_streaks: top_streaks.iter().map(Into::into).collect(),
            top_experience: top_experience.iter().map(Into::into).collect(),
            top_coins: top_coins.iter().map(Into::into).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{
        MemoryEventLog, MemoryQuestCatalog, MemoryQuestProgressStore, MemoryUserStore,
    };
    use chrono::Duration;

    type TestEngine =
        HabitEngine<MemoryUserStore, MemoryQuestCatalog, MemoryQuestProgressStore, MemoryEventLog>;

    struct Fixture {
        engine: TestEngine,
        users: Arc<MemoryUserStore>,
        catalog: Arc<MemoryQuestCatalog>,
        progress: Arc<MemoryQuestProgressStore>,
        events: Arc<MemoryEventLog>,
    }

    fn fixture() -> Fixture {
        fixture_with(EngineConfig::default())
    }

    fn fixture_with(config: EngineConfig) -> Fixture {
        let users = Arc::new(MemoryUserStore::new());
        let catalog = Arc::new(MemoryQuestCatalog::new());
        let progress = Arc::new(MemoryQuestProgressStore::new());
        let events = Arc::new(MemoryEventLog::new());
        let engine = HabitEngine::new(
            users.clone(),
            catalog.clone(),
            progress.clone(),
            events.clone(),
            config,
        );
        Fixture {
            engine,
            users,
            catalog,
            progress,
            events,
        }
    }

    fn quest(category: QuestCategory, target: i64, reward: i64) -> QuestDoc {
        QuestDoc {
            title: format!("{} x{}", category, target),
            category,
            target_count: target,
            experience_reward: reward,
            active: true,
            ..Default::default()
        }
    }

    async fn user_with_last_event(
        fx: &Fixture,
        ago: Option<Duration>,
        now: DateTime<Utc>,
    ) -> ObjectId {
        let mut user = UserProgressDoc::new("tester".into());
        user.last_event_at = ago.map(|d| bson::DateTime::from_chrono(now - d));
        fx.users.insert(user).await
    }

    #[tokio::test]
    async fn test_log_event_unknown_user() {
        let fx = fixture();
        let err = fx
            .engine
            .log_event(
                &ObjectId::new(),
                QuestCategory::Relapse,
                Utc::now(),
                EventMetadata::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        assert!(fx.events.is_empty().await);
    }

    #[tokio::test]
    async fn test_log_event_updates_progression() {
        let fx = fixture();
        let now = Utc::now();
        let mut user = UserProgressDoc::new("tester".into());
        user.experience = 95;
        user.current_streak_days = 5;
        let user_id = fx.users.insert(user).await;

        let outcome = fx
            .engine
            .log_event(
                &user_id,
                QuestCategory::Relapse,
                now,
                EventMetadata {
                    mood: Some("stressed".into()),
                    triggers: vec!["late night".into()],
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.experience_gained, 10);
        assert!(outcome.leveled_up);
        assert_eq!(outcome.new_level, 2);
        assert_eq!(outcome.new_rank, Rank::Rookie);

        let stored = fx.users.get(&user_id).await.unwrap().unwrap();
        assert_eq!(stored.experience, 105);
        assert_eq!(stored.level, 2);
        assert_eq!(stored.current_streak_days, 0);
        assert_eq!(stored.longest_streak_days, 5);
        assert_eq!(stored.coins, 1);
        assert_eq!(stored.events_this_month, 1);
        assert_eq!(
            stored.last_event_at,
            Some(bson::DateTime::from_chrono(now))
        );
        assert_eq!(fx.events.len().await, 1);
    }

    #[tokio::test]
    async fn test_log_event_folds_live_streak_into_longest() {
        let fx = fixture();
        let now = Utc::now();
        // 12 whole days since the last event, never recomputed on read
        let user_id = user_with_last_event(&fx, Some(Duration::days(12)), now).await;

        fx.engine
            .log_event(&user_id, QuestCategory::Relapse, now, EventMetadata::default())
            .await
            .unwrap();

        let stored = fx.users.get(&user_id).await.unwrap().unwrap();
        assert_eq!(stored.current_streak_days, 0);
        assert_eq!(stored.longest_streak_days, 12);
    }

    #[tokio::test]
    async fn test_premium_threshold() {
        let fx = fixture_with(EngineConfig {
            premium_event_threshold: 2,
            ..Default::default()
        });
        let user_id = fx.users.insert(UserProgressDoc::new("tester".into())).await;

        let first = fx
            .engine
            .log_event(
                &user_id,
                QuestCategory::Relapse,
                Utc::now(),
                EventMetadata::default(),
            )
            .await
            .unwrap();
        assert!(!first.eligible_for_premium);

        let second = fx
            .engine
            .log_event(
                &user_id,
                QuestCategory::Relapse,
                Utc::now(),
                EventMetadata::default(),
            )
            .await
            .unwrap();
        assert!(second.eligible_for_premium);
    }

    #[tokio::test]
    async fn test_target_one_quest_claim_flow() {
        let fx = fixture();
        let user_id = fx.users.insert(UserProgressDoc::new("tester".into())).await;
        let quest_id = fx
            .catalog
            .insert(quest(QuestCategory::Relapse, 1, 50))
            .await;

        let completed = fx
            .engine
            .apply_progress(&user_id, QuestCategory::Relapse, 1)
            .await
            .unwrap();
        assert_eq!(completed, vec![quest_id]);

        let row = fx.progress.get(&user_id, &quest_id).await.unwrap().unwrap();
        assert_eq!(row.progress_count, 1);
        assert!(row.completed);
        assert!(row.completed_at.is_some());
        assert!(!row.claimed);

        let reward = fx.engine.claim_quest(&user_id, &quest_id).await.unwrap();
        assert_eq!(reward.experience_awarded, 50);
        assert_eq!(reward.currency_awarded, 5);

        let stored = fx.users.get(&user_id).await.unwrap().unwrap();
        assert_eq!(stored.experience, 50);
        assert_eq!(stored.coins, 5);

        let err = fx.engine.claim_quest(&user_id, &quest_id).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_claim_coins_floor_division() {
        let fx = fixture();
        let user_id = fx.users.insert(UserProgressDoc::new("tester".into())).await;
        let quest_id = fx
            .catalog
            .insert(quest(QuestCategory::Mood, 1, 75))
            .await;

        fx.engine
            .apply_progress(&user_id, QuestCategory::Mood, 1)
            .await
            .unwrap();
        let reward = fx.engine.claim_quest(&user_id, &quest_id).await.unwrap();

        // 75 / 10 floors to 7
        assert_eq!(reward.currency_awarded, 7);
    }

    #[tokio::test]
    async fn test_apply_progress_rejects_non_positive_amount() {
        let fx = fixture();
        let user_id = ObjectId::new();
        for amount in [0, -3] {
            let err = fx
                .engine
                .apply_progress(&user_id, QuestCategory::Mood, amount)
                .await
                .unwrap_err();
            assert!(matches!(err, EngineError::InvalidState(_)));
        }
    }

    #[tokio::test]
    async fn test_completion_edge_fires_exactly_once() {
        let fx = fixture();
        let user_id = ObjectId::new();
        let quest_id = fx
            .catalog
            .insert(quest(QuestCategory::Relapse, 3, 100))
            .await;

        let completed = fx
            .engine
            .apply_progress(&user_id, QuestCategory::Relapse, 2)
            .await
            .unwrap();
        assert!(completed.is_empty());

        let completed = fx
            .engine
            .apply_progress(&user_id, QuestCategory::Relapse, 2)
            .await
            .unwrap();
        assert_eq!(completed, vec![quest_id]);
        let first_completed_at = fx
            .progress
            .get(&user_id, &quest_id)
            .await
            .unwrap()
            .unwrap()
            .completed_at;

        // Over-target increments never re-fire the edge
        for _ in 0..3 {
            let completed = fx
                .engine
                .apply_progress(&user_id, QuestCategory::Relapse, 5)
                .await
                .unwrap();
            assert!(completed.is_empty());
        }

        let row = fx.progress.get(&user_id, &quest_id).await.unwrap().unwrap();
        assert_eq!(row.completed_at, first_completed_at);
        assert_eq!(row.progress_count, 19);
    }

    #[tokio::test]
    async fn test_progress_only_touches_matching_active_quests() {
        let fx = fixture();
        let user_id = ObjectId::new();
        let relapse_id = fx
            .catalog
            .insert(quest(QuestCategory::Relapse, 5, 100))
            .await;
        let mood_id = fx.catalog.insert(quest(QuestCategory::Mood, 5, 100)).await;
        let mut inactive = quest(QuestCategory::Relapse, 5, 100);
        inactive.active = false;
        let inactive_id = fx.catalog.insert(inactive).await;

        fx.engine
            .apply_progress(&user_id, QuestCategory::Relapse, 1)
            .await
            .unwrap();

        assert!(fx.progress.get(&user_id, &relapse_id).await.unwrap().is_some());
        assert!(fx.progress.get(&user_id, &mood_id).await.unwrap().is_none());
        assert!(fx
            .progress
            .get(&user_id, &inactive_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_streak_milestone_quest() {
        let fx = fixture();
        let user_id = fx.users.insert(UserProgressDoc::new("tester".into())).await;
        let quest_id = fx
            .catalog
            .insert(quest(QuestCategory::Streak, 7, 200))
            .await;

        // Caller reports a 7-day milestone as streak progress
        let completed = fx
            .engine
            .apply_progress(&user_id, QuestCategory::Streak, 7)
            .await
            .unwrap();
        assert_eq!(completed, vec![quest_id]);

        let reward = fx.engine.claim_quest(&user_id, &quest_id).await.unwrap();
        assert_eq!(reward.experience_awarded, 200);
        assert_eq!(reward.currency_awarded, 20);
    }

    #[tokio::test]
    async fn test_claim_errors() {
        let fx = fixture();
        let user_id = fx.users.insert(UserProgressDoc::new("tester".into())).await;
        let quest_id = fx
            .catalog
            .insert(quest(QuestCategory::Relapse, 3, 100))
            .await;

        // Unknown quest
        let err = fx
            .engine
            .claim_quest(&user_id, &ObjectId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        // No progress row yet
        let err = fx.engine.claim_quest(&user_id, &quest_id).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        // In progress but incomplete
        fx.engine
            .apply_progress(&user_id, QuestCategory::Relapse, 1)
            .await
            .unwrap();
        let err = fx.engine.claim_quest(&user_id, &quest_id).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));

        // Nothing was granted along the way
        let stored = fx.users.get(&user_id).await.unwrap().unwrap();
        assert_eq!(stored.experience, 0);
        assert_eq!(stored.coins, 0);
    }

    #[tokio::test]
    async fn test_concurrent_claims_grant_exactly_once() {
        let fx = fixture();
        let user_id = fx.users.insert(UserProgressDoc::new("tester".into())).await;
        let quest_id = fx
            .catalog
            .insert(quest(QuestCategory::Relapse, 1, 50))
            .await;
        fx.engine
            .apply_progress(&user_id, QuestCategory::Relapse, 1)
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            fx.engine.claim_quest(&user_id, &quest_id),
            fx.engine.claim_quest(&user_id, &quest_id),
        );

        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        for result in [a, b] {
            if let Err(err) = result {
                assert!(matches!(
                    err,
                    EngineError::Conflict(_) | EngineError::InvalidState(_)
                ));
            }
        }

        // Exactly one reward landed
        let stored = fx.users.get(&user_id).await.unwrap().unwrap();
        assert_eq!(stored.experience, 50);
        assert_eq!(stored.coins, 5);
    }

    #[tokio::test]
    async fn test_get_progress_truncates_partial_days() {
        let fx = fixture();
        let now = Utc::now();
        let user_id =
            user_with_last_event(&fx, Some(Duration::days(3) + Duration::hours(4)), now).await;

        let snapshot = fx.engine.get_progress(&user_id, now).await.unwrap();
        assert_eq!(snapshot.current_streak_days, 3);
        assert_eq!(snapshot.longest_streak_days, 3);

        // 23 hours after an event the streak is still zero
        let user_id = user_with_last_event(&fx, Some(Duration::hours(23)), now).await;
        let snapshot = fx.engine.get_progress(&user_id, now).await.unwrap();
        assert_eq!(snapshot.current_streak_days, 0);
    }

    #[tokio::test]
    async fn test_get_progress_recompute_is_idempotent() {
        let fx = fixture();
        let now = Utc::now();
        let user_id = user_with_last_event(&fx, Some(Duration::days(5)), now).await;

        let first = fx.engine.get_progress(&user_id, now).await.unwrap();
        let stored_after_first = fx.users.get(&user_id).await.unwrap().unwrap();

        let second = fx.engine.get_progress(&user_id, now).await.unwrap();
        let stored_after_second = fx.users.get(&user_id).await.unwrap().unwrap();

        assert_eq!(first.current_streak_days, second.current_streak_days);
        assert_eq!(first.longest_streak_days, second.longest_streak_days);
        assert_eq!(
            stored_after_first.current_streak_days,
            stored_after_second.current_streak_days
        );
        assert_eq!(
            stored_after_first.longest_streak_days,
            stored_after_second.longest_streak_days
        );
        assert_eq!(
            stored_after_first.metadata.updated_at,
            stored_after_second.metadata.updated_at
        );
    }

    #[tokio::test]
    async fn test_get_progress_counts_from_creation_without_events() {
        let fx = fixture();
        let now = Utc::now();
        let mut user = UserProgressDoc::new("tester".into());
        user.metadata.created_at = Some(bson::DateTime::from_chrono(now - Duration::days(8)));
        let user_id = fx.users.insert(user).await;

        let snapshot = fx.engine.get_progress(&user_id, now).await.unwrap();
        assert_eq!(snapshot.current_streak_days, 8);
    }

    #[tokio::test]
    async fn test_longest_streak_never_decreases() {
        let fx = fixture();
        let now = Utc::now();
        let mut user = UserProgressDoc::new("tester".into());
        user.longest_streak_days = 20;
        user.last_event_at = Some(bson::DateTime::from_chrono(now - Duration::days(4)));
        let user_id = fx.users.insert(user).await;

        // Recompute to 4 days; record stays at 20
        let snapshot = fx.engine.get_progress(&user_id, now).await.unwrap();
        assert_eq!(snapshot.current_streak_days, 4);
        assert_eq!(snapshot.longest_streak_days, 20);

        // Logging an event resets the streak but not the record
        fx.engine
            .log_event(&user_id, QuestCategory::Relapse, now, EventMetadata::default())
            .await
            .unwrap();
        let stored = fx.users.get(&user_id).await.unwrap().unwrap();
        assert_eq!(stored.current_streak_days, 0);
        assert_eq!(stored.longest_streak_days, 20);
    }

    #[tokio::test]
    async fn test_get_progress_derives_rank_from_live_streak() {
        let fx = fixture();
        let now = Utc::now();
        let mut user = UserProgressDoc::new("tester".into());
        user.experience = 2_950;
        user.level = 30;
        user.last_event_at = Some(bson::DateTime::from_chrono(now - Duration::days(60)));
        let user_id = fx.users.insert(user).await;

        let snapshot = fx.engine.get_progress(&user_id, now).await.unwrap();
        assert_eq!(snapshot.level, 30);
        assert_eq!(snapshot.current_streak_days, 60);
        assert_eq!(snapshot.rank, Rank::Diamond);
        assert_eq!(snapshot.experience_for_next_level, 3_000);
    }

    #[tokio::test]
    async fn test_get_progress_unknown_user() {
        let fx = fixture();
        let err = fx
            .engine
            .get_progress(&ObjectId::new(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_quests_with_progress() {
        let fx = fixture();
        let user_id = ObjectId::new();
        let started_id = fx
            .catalog
            .insert(quest(QuestCategory::Relapse, 5, 100))
            .await;
        let untouched_id = fx.catalog.insert(quest(QuestCategory::Mood, 3, 75)).await;

        fx.engine
            .apply_progress(&user_id, QuestCategory::Relapse, 2)
            .await
            .unwrap();

        let listing = fx.engine.list_quests_with_progress(&user_id).await.unwrap();
        assert_eq!(listing.len(), 2);

        let started = listing
            .iter()
            .find(|q| q.quest._id == Some(started_id))
            .unwrap();
        assert_eq!(started.progress_count, 2);
        assert!(!started.completed);

        let untouched = listing
            .iter()
            .find(|q| q.quest._id == Some(untouched_id))
            .unwrap();
        assert_eq!(untouched.progress_count, 0);
        assert!(!untouched.completed);
        assert!(!untouched.claimed);
    }

    #[tokio::test]
    async fn test_leaderboard_orders_each_metric() {
        let fx = fixture();
        for (name, xp, streak, coins) in [
            ("alpha", 500_i64, 2_i64, 1_i64),
            ("beta", 100, 30, 9),
            ("gamma", 250, 10, 4),
        ] {
            let mut user = UserProgressDoc::new(name.into());
            user.experience = xp;
            user.current_streak_days = streak;
            user.coins = coins;
            fx.users.insert(user).await;
        }

        let board = fx.engine.leaderboard(2).await.unwrap();
        assert_eq!(board.top_experience[0].name, "alpha");
        assert_eq!(board.top_streaks[0].name, "beta");
        assert_eq!(board.top_coins[0].name, "beta");
        assert_eq!(board.top_experience.len(), 2);
    }
}
