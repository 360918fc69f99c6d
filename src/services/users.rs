// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! User directory: profiles, their zeroed stats, and achievements.

use crate::db::{collections, Deadline, Precondition, RetryPolicy, Store, StoreError};
use crate::error::{AppError, Result};
use crate::models::{ExperienceLevel, User, UserStats};
use crate::services::StatsAggregator;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Input for [`UserDirectory::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub photo_url: Option<String>,
    pub box_name: String,
    pub country: String,
    pub city: String,
    pub experience_level: ExperienceLevel,
}

#[derive(Clone)]
pub struct UserDirectory {
    store: Store,
    stats: StatsAggregator,
    policy: RetryPolicy,
}

impl UserDirectory {
    pub fn new(store: Store, stats: StatsAggregator, policy: RetryPolicy) -> Self {
        Self {
            store,
            stats,
            policy,
        }
    }

    /// Create a profile and its zeroed stats. Fails with `AlreadyExists`
    /// if the id is taken.
    pub async fn create_user(&self, new: NewUser, deadline: Deadline) -> Result<User> {
        let now = Utc::now();
        let user = User {
            id: new.id,
            email: new.email,
            name: new.name,
            photo_url: new.photo_url,
            box_name: new.box_name,
            country: new.country,
            city: new.city,
            experience_level: new.experience_level,
            points: 0,
            wod_count: 0,
            achievements: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        };

        match self
            .store
            .put(
                collections::USERS,
                &user.id,
                &user,
                Precondition::MustNotExist,
                deadline,
            )
            .await
        {
            Ok(()) => {}
            Err(StoreError::Conflict { .. }) => {
                // A retry after a failed stats write must still leave stats behind.
                self.stats.initialize(&user.id, now, deadline).await?;
                return Err(AppError::AlreadyExists(format!("User {} already exists", user.id)));
            }
            Err(e) => return Err(e.into()),
        }

        self.stats.initialize(&user.id, now, deadline).await?;

        tracing::info!(user_id = %user.id, "Created user");
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str, deadline: Deadline) -> Result<User> {
        self.store
            .get::<User>(collections::USERS, user_id, deadline)
            .await?
            .map(|v| v.data)
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))
    }

    /// Stats for an existing user. A user whose stats document was never
    /// written reads as zeroed stats.
    pub async fn get_stats(&self, user_id: &str, deadline: Deadline) -> Result<UserStats> {
        match self.stats.get_stats(user_id, deadline).await {
            Err(AppError::NotFound(_)) => {
                let user = self.get_user(user_id, deadline).await?;
                Ok(UserStats::new(&user.id, user.created_at))
            }
            other => other,
        }
    }

    /// Add `achievement` to the user's set and bring the stats count up to date.
    /// Granting an achievement twice is a no-op.
    pub async fn grant_achievement(
        &self,
        user_id: &str,
        achievement: &str,
        deadline: Deadline,
    ) -> Result<User> {
        self.grant_achievement_at(user_id, achievement, Utc::now(), deadline)
            .await
    }

    async fn grant_achievement_at(
        &self,
        user_id: &str,
        achievement: &str,
        now: DateTime<Utc>,
        deadline: Deadline,
    ) -> Result<User> {
        let user = self
            .store
            .update::<User, _>(
                collections::USERS,
                user_id,
                self.policy,
                deadline,
                |current| {
                    let user = current?;
                    if user.achievements.contains(achievement) {
                        return None;
                    }
                    let mut next = user.clone();
                    next.achievements.insert(achievement.to_string());
                    next.updated_at = now;
                    Some(next)
                },
            )
            .await?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))?;

        let count = u32::try_from(user.achievements.len()).unwrap_or(u32::MAX);
        self.stats
            .record_achievements(user_id, count, now, deadline)
            .await?;

        tracing::debug!(user_id, achievement, "Granted achievement");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use std::time::Duration;

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    fn directory() -> UserDirectory {
        let store = Store::new(MemoryStore::new());
        let stats = StatsAggregator::new(store.clone(), RetryPolicy::default());
        UserDirectory::new(store, stats, RetryPolicy::default())
    }

    fn new_user(id: &str) -> NewUser {
        NewUser {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            name: "Ana".to_string(),
            photo_url: None,
            box_name: "CrossFit Norte".to_string(),
            country: "PE".to_string(),
            city: "Lima".to_string(),
            experience_level: ExperienceLevel::Intermediate,
        }
    }

    #[tokio::test]
    async fn test_create_user_starts_with_zeroed_stats() {
        let users = directory();
        let user = users.create_user(new_user("ana"), deadline()).await.unwrap();
        assert_eq!(user.points, 0);

        let stats = users.get_stats("ana", deadline()).await.unwrap();
        assert_eq!(stats.total_wods, 0);
        assert_eq!(stats.consecutive_days, 0);
        assert!(stats.last_workout_date.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_user_is_rejected() {
        let users = directory();
        users.create_user(new_user("ana"), deadline()).await.unwrap();
        let err = users.create_user(new_user("ana"), deadline()).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(_)));
    }

    /// A profile written without its stats, as left by a create that failed
    /// between the two writes.
    async fn user_without_stats(users: &UserDirectory, id: &str) {
        let now = Utc::now();
        let new = new_user(id);
        let user = User {
            id: new.id,
            email: new.email,
            name: new.name,
            photo_url: None,
            box_name: new.box_name,
            country: new.country,
            city: new.city,
            experience_level: new.experience_level,
            points: 0,
            wod_count: 0,
            achievements: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        };
        users
            .store
            .put(collections::USERS, id, &user, Precondition::MustNotExist, deadline())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_stats_read_as_zeroed() {
        let users = directory();
        user_without_stats(&users, "ana").await;

        let stats = users.get_stats("ana", deadline()).await.unwrap();
        assert_eq!(stats.user_id, "ana");
        assert_eq!(stats.total_wods, 0);

        let err = users.get_stats("ghost", deadline()).await.unwrap_err();
        assert!(matches!(err, AppError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_retried_create_backfills_stats() {
        let users = directory();
        user_without_stats(&users, "ana").await;

        let err = users.create_user(new_user("ana"), deadline()).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(_)));

        let stored = users
            .store
            .get::<UserStats>(collections::USER_STATS, "ana", deadline())
            .await
            .unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn test_grant_achievement_is_idempotent_and_counted() {
        let users = directory();
        users.create_user(new_user("ana"), deadline()).await.unwrap();

        users.grant_achievement("ana", "first-wod", deadline()).await.unwrap();
        users.grant_achievement("ana", "first-wod", deadline()).await.unwrap();
        let user = users.grant_achievement("ana", "streak-7", deadline()).await.unwrap();

        assert_eq!(user.achievements.len(), 2);
        let stats = users.get_stats("ana", deadline()).await.unwrap();
        assert_eq!(stats.achievement_count, 2);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let users = directory();
        let err = users.get_user("ghost", deadline()).await.unwrap_err();
        assert!(matches!(err, AppError::UserNotFound(_)));

        let err = users
            .grant_achievement("ghost", "first-wod", deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UserNotFound(_)));
    }
}
