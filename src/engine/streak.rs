//! Streak arithmetic
//!
//! A streak here measures whole days elapsed since the last tracked event
//! (or since account creation when nothing was ever logged). Logging an
//! event resets it to zero; reads recompute it lazily instead of relying on
//! a background timer.

use bson::DateTime;
use chrono::{DateTime as ChronoDateTime, Utc};

use crate::db::schemas::UserProgressDoc;

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole days between two instants, truncated toward zero and clamped at 0.
///
/// 23 hours elapsed is 0 days, 3 days 4 hours is 3 days.
pub fn whole_days_between(earlier: ChronoDateTime<Utc>, now: ChronoDateTime<Utc>) -> i64 {
    let elapsed = now.signed_duration_since(earlier).num_seconds();
    if elapsed <= 0 {
        return 0;
    }
    elapsed / SECONDS_PER_DAY
}

/// Streak length for a user record at a given instant.
///
/// Counts from the last logged event, falling back to the account creation
/// timestamp for users who have never logged one.
pub fn current_streak_days(user: &UserProgressDoc, now: ChronoDateTime<Utc>) -> i64 {
    let since = user
        .last_event_at
        .or(user.metadata.created_at)
        .map(DateTime::to_chrono);

    match since {
        Some(start) => whole_days_between(start, now),
        // No creation timestamp either; nothing to count from
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn doc_with_last_event(ago: Duration, now: ChronoDateTime<Utc>) -> UserProgressDoc {
        let mut user = UserProgressDoc::new("test".into());
        user.last_event_at = Some(DateTime::from_chrono(now - ago));
        user
    }

    #[test]
    fn test_truncates_partial_days() {
        let now = Utc::now();
        let user = doc_with_last_event(Duration::days(3) + Duration::hours(4), now);
        assert_eq!(current_streak_days(&user, now), 3);
    }

    #[test]
    fn test_under_one_day_is_zero() {
        let now = Utc::now();
        let user = doc_with_last_event(Duration::hours(23), now);
        assert_eq!(current_streak_days(&user, now), 0);
    }

    #[test]
    fn test_negative_elapsed_clamps_to_zero() {
        let now = Utc::now();
        let user = doc_with_last_event(Duration::hours(-2), now);
        assert_eq!(current_streak_days(&user, now), 0);
    }

    #[test]
    fn test_falls_back_to_account_creation() {
        let now = Utc::now();
        let mut user = UserProgressDoc::new("test".into());
        user.metadata.created_at = Some(DateTime::from_chrono(now - Duration::days(10)));
        user.last_event_at = None;
        assert_eq!(current_streak_days(&user, now), 10);
    }

    #[test]
    fn test_last_event_wins_over_creation() {
        let now = Utc::now();
        let mut user = doc_with_last_event(Duration::days(2), now);
        user.metadata.created_at = Some(DateTime::from_chrono(now - Duration::days(30)));
        assert_eq!(current_streak_days(&user, now), 2);
    }
}
