// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! Result ledger.
//!
//! Handles the submission workflow:
//! 1. Resolve the referenced WOD and user
//! 2. Persist the result (create-only)
//! 3. Hand the recorded result to the stats aggregator
//!
//! A failure in step 3 leaves the result recorded; the caller gets
//! `StatsUpdateFailed` with the result id and can reconcile later.

use crate::db::{collections, Deadline, Direction, Page, Precondition, Query, Store, StoreError};
use crate::error::{AppError, Result};
use crate::models::{DifficultyLevel, User, UserStats, Wod, WodResult};
use crate::services::{decode_cursor, page_limit, StatsAggregator};
use chrono::{DateTime, Utc};
use futures_util::future::try_join;
use uuid::Uuid;

/// Input for [`ResultLedger::submit_result`].
#[derive(Debug, Clone)]
pub struct NewResult {
    /// Generated (UUID v4) when absent
    pub id: Option<String>,
    pub wod_id: String,
    pub user_id: String,
    pub level: DifficultyLevel,
    pub score: u32,
    pub time_seconds: Option<u32>,
    pub notes: Option<String>,
}

/// Sole writer of `WodResult` documents.
#[derive(Clone)]
pub struct ResultLedger {
    store: Store,
    stats: StatsAggregator,
}

impl ResultLedger {
    pub fn new(store: Store, stats: StatsAggregator) -> Self {
        Self { store, stats }
    }

    pub async fn submit_result(&self, new: NewResult, deadline: Deadline) -> Result<WodResult> {
        self.submit_result_at(new, Utc::now(), deadline).await
    }

    /// Record a result as of `now` and count it in the user's stats.
    pub async fn submit_result_at(
        &self,
        new: NewResult,
        now: DateTime<Utc>,
        deadline: Deadline,
    ) -> Result<WodResult> {
        let (wod, user) = try_join(
            self.store
                .get::<Wod>(collections::WODS, &new.wod_id, deadline),
            self.store
                .get::<User>(collections::USERS, &new.user_id, deadline),
        )
        .await?;

        let wod = wod
            .ok_or_else(|| AppError::WodNotFound(new.wod_id.clone()))?
            .data;
        if user.is_none() {
            return Err(AppError::UserNotFound(new.user_id));
        }
        if !wod.accepts_level(new.level) {
            return Err(AppError::Validation(format!(
                "WOD {} has no {} variant",
                wod.id,
                new.level.as_str()
            )));
        }

        let result = WodResult {
            id: new
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            wod_id: new.wod_id,
            user_id: new.user_id,
            level: new.level,
            score: new.score,
            time_seconds: new.time_seconds,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };

        match self
            .store
            .put(
                collections::WOD_RESULTS,
                &result.id,
                &result,
                Precondition::MustNotExist,
                deadline,
            )
            .await
        {
            Ok(()) => {}
            Err(StoreError::Conflict { .. }) => {
                return Err(AppError::AlreadyExists(format!(
                    "Result {} already exists",
                    result.id
                )));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            result_id = %result.id,
            user_id = %result.user_id,
            wod_id = %result.wod_id,
            score = result.score,
            "Recorded result"
        );

        // From here on the result exists; every failure must say so.
        self.stats
            .apply_result(&result, now, deadline)
            .await
            .map_err(|e| match e {
                AppError::StatsUpdateFailed { .. } => e,
                other => AppError::StatsUpdateFailed {
                    result_id: result.id.clone(),
                    reason: other.to_string(),
                },
            })?;

        Ok(result)
    }

    /// Re-run the stats update for an already-recorded result.
    pub async fn reconcile_result(&self, result_id: &str, deadline: Deadline) -> Result<UserStats> {
        let result = self.get_result(result_id, deadline).await?;
        let stats = self.stats.apply_result(&result, Utc::now(), deadline).await?;
        tracing::info!(result_id, user_id = %result.user_id, "Reconciled result");
        Ok(stats)
    }

    pub async fn get_result(&self, result_id: &str, deadline: Deadline) -> Result<WodResult> {
        self.store
            .get::<WodResult>(collections::WOD_RESULTS, result_id, deadline)
            .await?
            .map(|v| v.data)
            .ok_or_else(|| AppError::NotFound(format!("Result {result_id}")))
    }

    /// A user's results, newest first.
    pub async fn get_user_history(
        &self,
        user_id: &str,
        limit: Option<u32>,
        cursor: Option<&str>,
        deadline: Deadline,
    ) -> Result<Page<WodResult>> {
        let query = Query::new(collections::WOD_RESULTS)
            .eq("user_id", user_id)
            .order_by("created_at", Direction::Descending)
            .order_by("id", Direction::Ascending)
            .limit(page_limit(limit));
        let cursor = decode_cursor(cursor, query.order_by.len())?;

        Ok(self.store.query_page(query, cursor, deadline).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, RetryPolicy};
    use crate::models::{WodType, WodVariant};
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, day, 8, 0, 0).unwrap()
    }

    async fn setup() -> (Store, ResultLedger) {
        let store = Store::new(MemoryStore::new());
        let stats = StatsAggregator::new(store.clone(), RetryPolicy::default());
        let ledger = ResultLedger::new(store.clone(), stats);

        let wod = Wod {
            id: "murph".to_string(),
            date: at(1),
            wod_type: WodType::ForTime,
            title: "Murph".to_string(),
            description: String::new(),
            time_limit: None,
            variants: BTreeMap::from([(
                DifficultyLevel::Rx,
                WodVariant {
                    level: DifficultyLevel::Rx,
                    movements: vec![],
                    description: "With vest".to_string(),
                },
            )]),
            created_at: at(1),
            updated_at: at(1),
        };
        store
            .put(collections::WODS, &wod.id, &wod, Precondition::None, deadline())
            .await
            .unwrap();
        store
            .put(
                collections::USERS,
                "ana",
                &serde_json::json!({
                    "id": "ana",
                    "email": "ana@example.com",
                    "name": "Ana",
                    "created_at": "2026-01-01T00:00:00Z",
                    "updated_at": "2026-01-01T00:00:00Z"
                }),
                Precondition::None,
                deadline(),
            )
            .await
            .unwrap();

        (store, ledger)
    }

    fn new_result(id: Option<&str>, score: u32) -> NewResult {
        NewResult {
            id: id.map(str::to_string),
            wod_id: "murph".to_string(),
            user_id: "ana".to_string(),
            level: DifficultyLevel::Rx,
            score,
            time_seconds: Some(2700),
            notes: None,
        }
    }

    async fn stats_of(store: &Store, user_id: &str) -> UserStats {
        store
            .get::<UserStats>(collections::USER_STATS, user_id, deadline())
            .await
            .unwrap()
            .unwrap()
            .data
    }

    #[tokio::test]
    async fn test_submit_records_result_and_counts_it() {
        let (store, ledger) = setup().await;

        let result = ledger
            .submit_result_at(new_result(None, 100), at(1), deadline())
            .await
            .unwrap();

        assert!(Uuid::parse_str(&result.id).is_ok());
        assert_eq!(result.created_at, at(1));
        let stats = stats_of(&store, "ana").await;
        assert_eq!((stats.total_wods, stats.total_points), (1, 100));
    }

    #[tokio::test]
    async fn test_unknown_wod_and_user_are_rejected_before_writing() {
        let (store, ledger) = setup().await;

        let mut missing_wod = new_result(Some("r1"), 10);
        missing_wod.wod_id = "nope".to_string();
        let err = ledger.submit_result(missing_wod, deadline()).await.unwrap_err();
        assert!(matches!(err, AppError::WodNotFound(id) if id == "nope"));

        let mut missing_user = new_result(Some("r2"), 10);
        missing_user.user_id = "ghost".to_string();
        let err = ledger.submit_result(missing_user, deadline()).await.unwrap_err();
        assert!(matches!(err, AppError::UserNotFound(id) if id == "ghost"));

        for id in ["r1", "r2"] {
            assert!(store
                .get::<WodResult>(collections::WOD_RESULTS, id, deadline())
                .await
                .unwrap()
                .is_none());
        }
    }

    #[tokio::test]
    async fn test_level_without_variant_is_rejected() {
        let (_, ledger) = setup().await;
        let mut scaled = new_result(None, 10);
        scaled.level = DifficultyLevel::Beginner;

        let err = ledger.submit_result(scaled, deadline()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_reused_result_id_is_not_overwritten() {
        let (store, ledger) = setup().await;
        ledger
            .submit_result(new_result(Some("r1"), 100), deadline())
            .await
            .unwrap();

        let err = ledger
            .submit_result(new_result(Some("r1"), 5), deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(_)));

        let stored = ledger.get_result("r1", deadline()).await.unwrap();
        assert_eq!(stored.score, 100);
        assert_eq!(stats_of(&store, "ana").await.total_wods, 1);
    }

    #[tokio::test]
    async fn test_repeat_submissions_are_all_recorded() {
        let (store, ledger) = setup().await;
        for _ in 0..2 {
            ledger
                .submit_result_at(new_result(None, 30), at(2), deadline())
                .await
                .unwrap();
        }
        let stats = stats_of(&store, "ana").await;
        assert_eq!((stats.total_wods, stats.consecutive_days), (2, 1));
    }

    #[tokio::test]
    async fn test_stats_failure_keeps_result_and_reconcile_counts_once() {
        let (store, ledger) = setup().await;
        // Unreadable stats document.
        store
            .put(
                collections::USER_STATS,
                "ana",
                &serde_json::json!({"user_id": 7}),
                Precondition::None,
                deadline(),
            )
            .await
            .unwrap();

        let err = ledger
            .submit_result(new_result(Some("r1"), 40), deadline())
            .await
            .unwrap_err();
        assert!(matches!(&err, AppError::StatsUpdateFailed { result_id, .. } if result_id == "r1"));
        assert!(ledger.get_result("r1", deadline()).await.is_ok());

        store
            .delete(collections::USER_STATS, "ana", deadline())
            .await
            .unwrap();
        ledger.reconcile_result("r1", deadline()).await.unwrap();
        let stats = ledger.reconcile_result("r1", deadline()).await.unwrap();
        assert_eq!((stats.total_wods, stats.total_points), (1, 40));
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_paginated() {
        let (_, ledger) = setup().await;
        for day in 1..=3 {
            ledger
                .submit_result_at(new_result(Some(&format!("r{day}")), day * 10), at(day), deadline())
                .await
                .unwrap();
        }

        let first = ledger
            .get_user_history("ana", Some(2), None, deadline())
            .await
            .unwrap();
        let ids: Vec<_> = first.items.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["r3", "r2"]);

        let cursor = first.next_cursor.unwrap().encode();
        let rest = ledger
            .get_user_history("ana", Some(2), Some(&cursor), deadline())
            .await
            .unwrap();
        let ids: Vec<_> = rest.items.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["r1"]);
        assert!(rest.next_cursor.is_none());
    }
}
