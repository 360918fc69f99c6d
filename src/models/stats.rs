// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! Per-user statistics aggregates.
//!
//! These aggregates are maintained incrementally as results are recorded,
//! so profile and ranking reads never scan a user's full result history.

use crate::models::WodResult;
use crate::time_utils::{optional_rfc3339, rfc3339};
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// How many counted results a stats document remembers by id.
///
/// Keeps the document far below Firestore's 1 MiB limit however many
/// results a user records.
pub const PROCESSED_RESULT_WINDOW: usize = 1000;

/// A result already folded into [`UserStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedResult {
    pub id: String,
    #[serde(with = "rfc3339")]
    pub created_at: DateTime<Utc>,
}

/// Running statistics for a user.
///
/// Stored at: `user_stats/{user_id}`
///
/// Written only through version-checked updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserStats {
    pub user_id: String,

    // ─── Totals ──────────────────────────────────────────────────
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_wods: u64,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_points: u64,

    // ─── Streak ──────────────────────────────────────────────────
    /// Consecutive UTC calendar days with at least one result
    #[serde(default)]
    pub consecutive_days: u32,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub last_workout_date: Option<NaiveDate>,

    #[serde(default)]
    pub achievement_count: u32,

    // ─── Idempotency ─────────────────────────────────────────────
    /// The most recently counted results, oldest first
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(skip))]
    pub processed_results: VecDeque<ProcessedResult>,
    /// Newest creation time among results that left the window. Anything
    /// created at or before it has been counted.
    #[serde(default, with = "optional_rfc3339")]
    #[cfg_attr(feature = "binding-generation", ts(skip))]
    pub processed_through: Option<DateTime<Utc>>,

    // ─── Metadata ────────────────────────────────────────────────
    #[serde(with = "rfc3339")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}

impl UserStats {
    /// Zeroed stats for a user with no recorded results.
    pub fn new(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            total_wods: 0,
            total_points: 0,
            consecutive_days: 0,
            last_workout_date: None,
            achievement_count: 0,
            processed_results: VecDeque::new(),
            processed_through: None,
            updated_at: now,
        }
    }

    /// Rebuild stats from a user's complete result history.
    pub fn from_results(user_id: &str, results: &[WodResult], now: DateTime<Utc>) -> Self {
        let mut ordered: Vec<&WodResult> = results.iter().collect();
        ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let mut stats = Self::new(user_id, now);
        for result in ordered {
            stats.apply_result(result, now);
        }
        stats
    }

    /// Count a new result.
    ///
    /// Returns `true` if the result was applied (new).
    /// Returns `false` if it was already counted (duplicate).
    pub fn apply_result(&mut self, result: &WodResult, now: DateTime<Utc>) -> bool {
        if self.already_counted(result) {
            return false;
        }
        self.remember(result);
        self.updated_at = now;

        self.total_wods += 1;
        self.total_points += u64::from(result.score);

        let today = result.created_at.date_naive();
        match self.last_workout_date {
            Some(prev) if today == prev => {}
            Some(prev) if prev.checked_add_days(Days::new(1)) == Some(today) => {
                self.consecutive_days += 1;
                self.last_workout_date = Some(today);
            }
            // Backdated result: counted, but the streak only moves forward.
            Some(prev) if today < prev => {}
            _ => {
                self.consecutive_days = 1;
                self.last_workout_date = Some(today);
            }
        }

        true
    }

    fn already_counted(&self, result: &WodResult) -> bool {
        self.processed_through
            .is_some_and(|through| result.created_at <= through)
            || self.processed_results.iter().any(|p| p.id == result.id)
    }

    fn remember(&mut self, result: &WodResult) {
        self.processed_results.push_back(ProcessedResult {
            id: result.id.clone(),
            created_at: result.created_at,
        });
        while self.processed_results.len() > PROCESSED_RESULT_WINDOW {
            if let Some(evicted) = self.processed_results.pop_front() {
                self.processed_through = self.processed_through.max(Some(evicted.created_at));
            }
        }
    }
}
