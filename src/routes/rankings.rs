// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! Ranking and leaderboard routes.

use crate::error::Result;
use crate::models::{DifficultyLevel, User, WodResult};
use crate::routes::{PageQuery, PageResponse};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/rankings/global", get(global_ranking))
        .route("/api/rankings/box", get(box_ranking))
        .route("/api/rankings/location", get(location_ranking))
        .route("/api/leaderboard", get(leaderboard))
}

/// Public view of a ranked user.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RankedUser {
    pub id: String,
    pub name: String,
    pub photo_url: Option<String>,
    #[serde(rename = "box")]
    pub box_name: String,
    pub country: String,
    pub city: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub points: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub wod_count: u64,
}

impl From<User> for RankedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            photo_url: user.photo_url,
            box_name: user.box_name,
            country: user.country,
            city: user.city,
            points: user.points,
            wod_count: user.wod_count,
        }
    }
}

async fn global_ranking(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageQuery>,
) -> Result<Json<PageResponse<RankedUser>>> {
    let page = state
        .rankings
        .global(params.limit, params.cursor.as_deref(), state.deadline())
        .await?;
    Ok(Json(PageResponse::from_page(page, RankedUser::from)))
}

#[derive(Debug, Deserialize)]
struct BoxRankingQuery {
    #[serde(rename = "box", default)]
    box_name: String,
    limit: Option<u32>,
    cursor: Option<String>,
}

async fn box_ranking(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BoxRankingQuery>,
) -> Result<Json<PageResponse<RankedUser>>> {
    let page = state
        .rankings
        .by_box(
            &params.box_name,
            params.limit,
            params.cursor.as_deref(),
            state.deadline(),
        )
        .await?;
    Ok(Json(PageResponse::from_page(page, RankedUser::from)))
}

#[derive(Debug, Deserialize)]
struct LocationRankingQuery {
    #[serde(default)]
    country: String,
    city: Option<String>,
    limit: Option<u32>,
    cursor: Option<String>,
}

async fn location_ranking(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LocationRankingQuery>,
) -> Result<Json<PageResponse<RankedUser>>> {
    let page = state
        .rankings
        .by_location(
            &params.country,
            params.city.as_deref(),
            params.limit,
            params.cursor.as_deref(),
            state.deadline(),
        )
        .await?;
    Ok(Json(PageResponse::from_page(page, RankedUser::from)))
}

#[derive(Debug, Deserialize)]
struct LeaderboardQuery {
    wod_id: String,
    /// Defaults to RX
    level: Option<DifficultyLevel>,
    limit: Option<u32>,
    cursor: Option<String>,
}

/// Results for one WOD and level, best score first.
async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeaderboardQuery>,
) -> Result<Json<PageResponse<WodResult>>> {
    let page = state
        .rankings
        .leaderboard(
            &params.wod_id,
            params.level.unwrap_or(DifficultyLevel::Rx),
            params.limit,
            params.cursor.as_deref(),
            state.deadline(),
        )
        .await?;
    Ok(Json(page.into()))
}
