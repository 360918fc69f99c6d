// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! WOD catalog: one workout per UTC calendar date.

use crate::db::{
    collections, Deadline, Direction, FilterOp, Page, Precondition, Query, RetryPolicy, Store,
    StoreError,
};
use crate::error::{AppError, Result};
use crate::models::{DifficultyLevel, Wod, WodType, WodVariant};
use crate::services::{decode_cursor, page_limit};
use crate::time_utils::{day_bounds, format_utc_rfc3339, rfc3339, start_of_day};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Age in minutes after which an unfulfilled date claim may be taken over.
/// Far beyond any request deadline, so a live create never loses its claim.
const STALE_CLAIM_MINUTES: i64 = 10;

/// Input for [`WodCatalog::create_daily_wod`].
#[derive(Debug, Clone)]
pub struct NewWod {
    /// Defaults to the `YYYY-MM-DD` date when absent
    pub id: Option<String>,
    /// Any instant on the scheduled day; stored as that day's midnight UTC
    pub date: DateTime<Utc>,
    pub wod_type: WodType,
    pub title: String,
    pub description: String,
    pub time_limit: Option<u32>,
    pub variants: BTreeMap<DifficultyLevel, WodVariant>,
}

/// Replacement for the editable fields of a [`Wod`].
#[derive(Debug, Clone)]
pub struct WodEdit {
    pub wod_type: WodType,
    pub title: String,
    pub description: String,
    pub time_limit: Option<u32>,
    pub variants: BTreeMap<DifficultyLevel, WodVariant>,
}

/// `wod_dates/{YYYY-MM-DD}`: which WOD holds a calendar date.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DateClaim {
    wod_id: String,
    #[serde(with = "rfc3339")]
    claimed_at: DateTime<Utc>,
}

fn date_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Owns WOD documents and their date claims.
#[derive(Clone)]
pub struct WodCatalog {
    store: Store,
}

impl WodCatalog {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Schedule a WOD, failing with `AlreadyExists` if its date is taken.
    pub async fn create_daily_wod(&self, new: NewWod, deadline: Deadline) -> Result<Wod> {
        self.create_daily_wod_at(new, Utc::now(), deadline).await
    }

    pub async fn create_daily_wod_at(
        &self,
        new: NewWod,
        now: DateTime<Utc>,
        deadline: Deadline,
    ) -> Result<Wod> {
        let day = new.date.date_naive();
        let id = new
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| date_key(day));

        // The date claim, not the WOD id, is what keeps one WOD per day.
        self.claim_date(day, &id, now, deadline).await?;

        let wod = Wod {
            id,
            date: start_of_day(day),
            wod_type: new.wod_type,
            title: new.title,
            description: new.description,
            time_limit: new.time_limit,
            variants: new.variants,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self
            .store
            .put(
                collections::WODS,
                &wod.id,
                &wod,
                Precondition::MustNotExist,
                deadline,
            )
            .await
        {
            self.release_date(day, &wod.id, deadline).await;
            return Err(match e {
                StoreError::Conflict { .. } => {
                    AppError::AlreadyExists(format!("WOD {} already exists", wod.id))
                }
                other => other.into(),
            });
        }

        tracing::info!(wod_id = %wod.id, date = %day, "Created daily WOD");
        Ok(wod)
    }

    /// Replace the editable fields of a WOD. The id and date never change.
    pub async fn update_wod(&self, id: &str, edit: WodEdit, deadline: Deadline) -> Result<Wod> {
        self.update_wod_at(id, edit, Utc::now(), deadline).await
    }

    pub async fn update_wod_at(
        &self,
        id: &str,
        edit: WodEdit,
        now: DateTime<Utc>,
        deadline: Deadline,
    ) -> Result<Wod> {
        let wod = self
            .store
            .update::<Wod, _>(
                collections::WODS,
                id,
                RetryPolicy::default(),
                deadline,
                |current| {
                    let mut next = current?.clone();
                    next.wod_type = edit.wod_type;
                    next.title = edit.title.clone();
                    next.description = edit.description.clone();
                    next.time_limit = edit.time_limit;
                    next.variants = edit.variants.clone();
                    next.updated_at = now;
                    Some(next)
                },
            )
            .await?
            .ok_or_else(|| AppError::WodNotFound(id.to_string()))?;

        tracing::info!(wod_id = %wod.id, "Updated WOD");
        Ok(wod)
    }

    /// The WOD scheduled for `day`.
    pub async fn get_wod_by_date(&self, day: NaiveDate, deadline: Deadline) -> Result<Wod> {
        self.find_by_day(day, deadline)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No WOD scheduled for {day}")))
    }

    pub async fn get_wod(&self, id: &str, deadline: Deadline) -> Result<Wod> {
        self.store
            .get::<Wod>(collections::WODS, id, deadline)
            .await?
            .map(|v| v.data)
            .ok_or_else(|| AppError::WodNotFound(id.to_string()))
    }

    /// Newest-first listing of scheduled WODs.
    pub async fn list_wods(
        &self,
        limit: Option<u32>,
        cursor: Option<&str>,
        deadline: Deadline,
    ) -> Result<Page<Wod>> {
        let query = Query::new(collections::WODS)
            .order_by("date", Direction::Descending)
            .order_by("id", Direction::Ascending)
            .limit(page_limit(limit));
        let cursor = decode_cursor(cursor, query.order_by.len())?;

        Ok(self.store.query_page(query, cursor, deadline).await?)
    }

    /// Remove a WOD that no result references yet.
    pub async fn delete_wod(&self, id: &str, deadline: Deadline) -> Result<()> {
        let wod = self.get_wod(id, deadline).await?;

        let referencing = Query::new(collections::WOD_RESULTS)
            .eq("wod_id", id)
            .limit(1);
        let results: Vec<serde_json::Value> = self.store.query(&referencing, deadline).await?;
        if !results.is_empty() {
            return Err(AppError::Conflict(format!("WOD {id} already has results")));
        }

        self.store.delete(collections::WODS, id, deadline).await?;
        self.release_date(wod.date.date_naive(), id, deadline).await;
        tracing::info!(wod_id = %id, "Deleted WOD");
        Ok(())
    }

    /// Take `day` for `wod_id` with a create-only write.
    ///
    /// A claim older than [`STALE_CLAIM_MINUTES`] whose WOD was never written is
    /// left over from a failed create and may be taken over.
    async fn claim_date(
        &self,
        day: NaiveDate,
        wod_id: &str,
        now: DateTime<Utc>,
        deadline: Deadline,
    ) -> Result<()> {
        let key = date_key(day);
        let claim = DateClaim {
            wod_id: wod_id.to_string(),
            claimed_at: now,
        };
        let taken = || AppError::AlreadyExists(format!("A WOD is already scheduled for {day}"));

        match self
            .store
            .put(
                collections::WOD_DATES,
                &key,
                &claim,
                Precondition::MustNotExist,
                deadline,
            )
            .await
        {
            Ok(()) => return Ok(()),
            Err(StoreError::Conflict { .. }) => {}
            Err(e) => return Err(e.into()),
        }

        let Some(held) = self
            .store
            .get::<DateClaim>(collections::WOD_DATES, &key, deadline)
            .await?
        else {
            return Err(taken());
        };
        if now - held.data.claimed_at < TimeDelta::minutes(STALE_CLAIM_MINUTES)
            || self
                .store
                .get::<Wod>(collections::WODS, &held.data.wod_id, deadline)
                .await?
                .is_some()
        {
            tracing::debug!(date = %day, holder = %held.data.wod_id, "Date already claimed");
            return Err(taken());
        }

        tracing::warn!(date = %day, stale = %held.data.wod_id, "Taking over abandoned date claim");
        match self
            .store
            .put(
                collections::WOD_DATES,
                &key,
                &claim,
                Precondition::Version(held.version),
                deadline,
            )
            .await
        {
            Ok(()) => Ok(()),
            Err(StoreError::Conflict { .. }) => Err(taken()),
            Err(e) => Err(e.into()),
        }
    }

    /// Drop `wod_id`'s claim on `day`. Failures only leave a stale claim
    /// behind, so they are logged rather than returned.
    async fn release_date(&self, day: NaiveDate, wod_id: &str, deadline: Deadline) {
        if let Err(e) = self.try_release_date(day, wod_id, deadline).await {
            tracing::error!(date = %day, wod_id, error = %e, "Failed to release date claim");
        }
    }

    async fn try_release_date(
        &self,
        day: NaiveDate,
        wod_id: &str,
        deadline: Deadline,
    ) -> std::result::Result<(), StoreError> {
        let key = date_key(day);
        match self
            .store
            .get::<DateClaim>(collections::WOD_DATES, &key, deadline)
            .await?
        {
            Some(held) if held.data.wod_id == wod_id => {
                self.store.delete(collections::WOD_DATES, &key, deadline).await
            }
            _ => Ok(()),
        }
    }

    /// WODs whose date falls in `[day, day + 1)`.
    async fn find_by_day(&self, day: NaiveDate, deadline: Deadline) -> Result<Option<Wod>> {
        let (start, end) = day_bounds(day);
        let query = Query::new(collections::WODS)
            .filter("date", FilterOp::GreaterThanOrEqual, format_utc_rfc3339(start))
            .filter("date", FilterOp::LessThan, format_utc_rfc3339(end))
            .order_by("date", Direction::Ascending)
            .limit(2);

        let mut wods: Vec<Wod> = self.store.query(&query, deadline).await?;
        match wods.len() {
            0 | 1 => Ok(wods.pop()),
            count => {
                tracing::error!(date = %day, count, "Multiple WODs scheduled for one date");
                Err(AppError::Internal(anyhow::anyhow!(
                    "multiple WODs scheduled for {day}"
                )))
            }
        }
    }
}
