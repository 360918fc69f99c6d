// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! Read-only ranking queries.
//!
//! Every ranking has a total order (the last sort key is the unique document
//! id), so identical data always yields identical pages and keyset cursors
//! never skip or repeat a row.

use crate::db::{collections, Deadline, Direction, Page, Query, Store};
use crate::error::{AppError, Result};
use crate::models::{DifficultyLevel, User, WodResult};
use crate::services::{decode_cursor, page_limit};

#[derive(Clone)]
pub struct RankingEngine {
    store: Store,
}

impl RankingEngine {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// All users by points.
    pub async fn global(
        &self,
        limit: Option<u32>,
        cursor: Option<&str>,
        deadline: Deadline,
    ) -> Result<Page<User>> {
        self.users(Query::new(collections::USERS), limit, cursor, deadline)
            .await
    }

    /// Users of one box by points.
    pub async fn by_box(
        &self,
        box_name: &str,
        limit: Option<u32>,
        cursor: Option<&str>,
        deadline: Deadline,
    ) -> Result<Page<User>> {
        if box_name.trim().is_empty() {
            return Err(AppError::Validation("box is required".to_string()));
        }
        let query = Query::new(collections::USERS).eq("box", box_name);
        self.users(query, limit, cursor, deadline).await
    }

    /// Users of a country, optionally narrowed to one city, by points.
    pub async fn by_location(
        &self,
        country: &str,
        city: Option<&str>,
        limit: Option<u32>,
        cursor: Option<&str>,
        deadline: Deadline,
    ) -> Result<Page<User>> {
        if country.trim().is_empty() {
            return Err(AppError::Validation("country is required".to_string()));
        }
        let mut query = Query::new(collections::USERS).eq("country", country);
        if let Some(city) = city.filter(|c| !c.trim().is_empty()) {
            query = query.eq("city", city);
        }
        self.users(query, limit, cursor, deadline).await
    }

    /// Results for one WOD and level by score.
    pub async fn leaderboard(
        &self,
        wod_id: &str,
        level: DifficultyLevel,
        limit: Option<u32>,
        cursor: Option<&str>,
        deadline: Deadline,
    ) -> Result<Page<WodResult>> {
        let query = Query::new(collections::WOD_RESULTS)
            .eq("wod_id", wod_id)
            .eq("level", level.as_str())
            .order_by("score", Direction::Descending)
            .order_by("id", Direction::Ascending)
            .limit(page_limit(limit));
        let cursor = decode_cursor(cursor, query.order_by.len())?;

        Ok(self.store.query_page(query, cursor, deadline).await?)
    }

    async fn users(
        &self,
        query: Query,
        limit: Option<u32>,
        cursor: Option<&str>,
        deadline: Deadline,
    ) -> Result<Page<User>> {
        let query = query
            .order_by("points", Direction::Descending)
            .order_by("id", Direction::Ascending)
            .limit(page_limit(limit));
        let cursor = decode_cursor(cursor, query.order_by.len())?;

        Ok(self.store.query_page(query, cursor, deadline).await?)
    }
}
