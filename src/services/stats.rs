// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! Stats aggregation service.
//!
//! Owns `user_stats/{user_id}` and the denormalized ranking fields on
//! `users/{user_id}`. Every write is version-checked; on conflict the
//! read-derive-write cycle is re-run up to the configured retry bound.

use crate::db::{
    collections, Deadline, Direction, Precondition, Query, RetryPolicy, Store, StoreError,
};
use crate::error::{AppError, Result};
use crate::models::{User, UserStats, WodResult};
use chrono::{DateTime, Utc};

/// How ranking fields on the user document are brought in line with stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldSync {
    /// Only ever raise (`max`), so replays and races are harmless.
    Raise,
    /// Overwrite, used after a full recalculation.
    Exact,
}

#[derive(Clone)]
pub struct StatsAggregator {
    store: Store,
    policy: RetryPolicy,
}

impl StatsAggregator {
    pub fn new(store: Store, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Count `result` in its user's stats, then raise the user's ranking fields.
    ///
    /// Idempotent per result id. Returns the committed stats.
    pub async fn apply_result(
        &self,
        result: &WodResult,
        now: DateTime<Utc>,
        deadline: Deadline,
    ) -> Result<UserStats> {
        let mut applied = false;
        let stats = self
            .store
            .update::<UserStats, _>(
                collections::USER_STATS,
                &result.user_id,
                self.policy,
                deadline,
                |current| {
                    let mut next = current
                        .cloned()
                        .unwrap_or_else(|| UserStats::new(&result.user_id, now));
                    applied = next.apply_result(result, now);
                    applied.then_some(next)
                },
            )
            .await
            .map_err(|e| degraded(&result.id, e))?
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("stats for {} vanished", result.user_id))
            })?;

        if applied {
            tracing::debug!(
                user_id = %result.user_id,
                result_id = %result.id,
                total_wods = stats.total_wods,
                consecutive_days = stats.consecutive_days,
                "Counted result"
            );
        } else {
            tracing::debug!(result_id = %result.id, "Result already counted");
        }

        self.sync_user(&stats, FieldSync::Raise, now, deadline)
            .await
            .map_err(|e| degraded(&result.id, e))?;

        Ok(stats)
    }

    pub async fn get_stats(&self, user_id: &str, deadline: Deadline) -> Result<UserStats> {
        self.store
            .get::<UserStats>(collections::USER_STATS, user_id, deadline)
            .await?
            .map(|v| v.data)
            .ok_or_else(|| AppError::NotFound(format!("No stats for user {user_id}")))
    }

    /// Create zeroed stats unless the user already has some.
    pub async fn initialize(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        deadline: Deadline,
    ) -> Result<()> {
        match self
            .store
            .put(
                collections::USER_STATS,
                user_id,
                &UserStats::new(user_id, now),
                Precondition::MustNotExist,
                deadline,
            )
            .await
        {
            Ok(()) | Err(StoreError::Conflict { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Raise `achievement_count` to at least `count`.
    pub async fn record_achievements(
        &self,
        user_id: &str,
        count: u32,
        now: DateTime<Utc>,
        deadline: Deadline,
    ) -> Result<UserStats> {
        let stats = self
            .store
            .update::<UserStats, _>(
                collections::USER_STATS,
                user_id,
                self.policy,
                deadline,
                |current| {
                    let mut next = current
                        .cloned()
                        .unwrap_or_else(|| UserStats::new(user_id, now));
                    if current.is_some() && next.achievement_count >= count {
                        return None;
                    }
                    next.achievement_count = next.achievement_count.max(count);
                    next.updated_at = now;
                    Some(next)
                },
            )
            .await?;

        stats.ok_or_else(|| AppError::Internal(anyhow::anyhow!("stats for {user_id} vanished")))
    }

    /// Rebuild a user's stats from every recorded result and overwrite the
    /// ranking fields with the rebuilt totals.
    ///
    /// Results are re-read on every attempt: a result recorded after the read
    /// bumps the stats version first, so the write conflicts and retries.
    pub async fn recalculate(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        deadline: Deadline,
    ) -> Result<UserStats> {
        let user = self
            .store
            .get::<User>(collections::USERS, user_id, deadline)
            .await?
            .map(|v| v.data)
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))?;

        let history = Query::new(collections::WOD_RESULTS)
            .eq("user_id", user_id)
            .order_by("created_at", Direction::Ascending)
            .order_by("id", Direction::Ascending);

        let mut attempt = 0;
        let stats = loop {
            let current = self
                .store
                .get::<UserStats>(collections::USER_STATS, user_id, deadline)
                .await?;
            let results: Vec<WodResult> = self.store.query(&history, deadline).await?;

            let mut next = UserStats::from_results(user_id, &results, now);
            let achievements = u32::try_from(user.achievements.len()).unwrap_or(u32::MAX);
            next.achievement_count = current
                .as_ref()
                .map(|c| c.data.achievement_count)
                .unwrap_or(0)
                .max(achievements);

            let precondition = match &current {
                Some(v) => Precondition::Version(v.version),
                None => Precondition::MustNotExist,
            };

            match self
                .store
                .put(collections::USER_STATS, user_id, &next, precondition, deadline)
                .await
            {
                Ok(()) => break next,
                Err(StoreError::Conflict { .. }) if attempt < self.policy.max_retries => {
                    attempt += 1;
                    tracing::warn!(user_id, attempt, "Stats changed during recalculation, retrying");
                    tokio::time::sleep(self.policy.delay(attempt)).await;
                }
                Err(StoreError::Conflict { .. }) => {
                    return Err(AppError::Conflict(format!(
                        "stats for {user_id} kept changing during recalculation"
                    )));
                }
                Err(e) => return Err(e.into()),
            }
        };

        self.sync_user(&stats, FieldSync::Exact, now, deadline).await?;

        tracing::info!(
            user_id,
            total_wods = stats.total_wods,
            total_points = stats.total_points,
            "Recalculated stats"
        );
        Ok(stats)
    }

    async fn sync_user(
        &self,
        stats: &UserStats,
        mode: FieldSync,
        now: DateTime<Utc>,
        deadline: Deadline,
    ) -> std::result::Result<(), StoreError> {
        let mut missing = false;
        self.store
            .update::<User, _>(
                collections::USERS,
                &stats.user_id,
                self.policy,
                deadline,
                |current| {
                    let Some(user) = current else {
                        missing = true;
                        return None;
                    };
                    let (points, wod_count) = match mode {
                        FieldSync::Raise => (
                            user.points.max(stats.total_points),
                            user.wod_count.max(stats.total_wods),
                        ),
                        FieldSync::Exact => (stats.total_points, stats.total_wods),
                    };
                    if user.points == points && user.wod_count == wod_count {
                        return None;
                    }
                    let mut next = user.clone();
                    next.points = points;
                    next.wod_count = wod_count;
                    next.updated_at = now;
                    Some(next)
                },
            )
            .await?;

        if missing {
            tracing::warn!(user_id = %stats.user_id, "No user document to carry ranking fields");
        }
        Ok(())
    }
}

/// Errors after a result was recorded. Timeouts stay distinct; everything
/// else means the stats are behind and the result needs reconciling.
fn degraded(result_id: &str, err: StoreError) -> AppError {
    match err {
        StoreError::Timeout { .. } => err.into(),
        other => AppError::StatsUpdateFailed {
            result_id: result_id.to_string(),
            reason: other.to_string(),
        },
    }
}
