// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! Profile, stats and history routes for the signed-in user, plus the
//! administrative user operations.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{ExperienceLevel, User, UserStats, WodResult};
use crate::routes::{PageQuery, PageResponse};
use crate::services::NewUser;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users", post(create_user))
        .route("/api/me", get(get_me))
        .route("/api/me/stats", get(get_my_stats))
        .route("/api/me/results", get(get_my_results))
}

/// Administrative user routes.
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users/{id}/achievements", post(grant_achievement))
        .route("/api/users/{id}/stats/recalculate", post(recalculate_stats))
}

// ─── Profile ─────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(url)]
    pub photo_url: Option<String>,
    #[serde(rename = "box", default)]
    #[validate(length(max = 100))]
    pub box_name: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub country: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub city: String,
    #[serde(default)]
    pub experience_level: ExperienceLevel,
}

/// Create the caller's profile. The user id is the token subject.
async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>)> {
    payload.validate()?;

    let created = state
        .users
        .create_user(
            NewUser {
                id: user.user_id,
                email: payload.email,
                name: payload.name,
                photo_url: payload.photo_url,
                box_name: payload.box_name,
                country: payload.country,
                city: payload.city,
                experience_level: payload.experience_level,
            },
            state.deadline(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<User>> {
    let profile = state.users.get_user(&user.user_id, state.deadline()).await?;
    Ok(Json(profile))
}

// ─── Stats ───────────────────────────────────────────────────

/// Stats as exposed over the API.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StatsResponse {
    pub user_id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_wods: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_points: u64,
    pub consecutive_days: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub last_workout_date: Option<NaiveDate>,
    pub achievement_count: u32,
}

impl From<UserStats> for StatsResponse {
    fn from(stats: UserStats) -> Self {
        Self {
            user_id: stats.user_id,
            total_wods: stats.total_wods,
            total_points: stats.total_points,
            consecutive_days: stats.consecutive_days,
            last_workout_date: stats.last_workout_date,
            achievement_count: stats.achievement_count,
        }
    }
}

async fn get_my_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<StatsResponse>> {
    let stats = state.users.get_stats(&user.user_id, state.deadline()).await?;
    Ok(Json(stats.into()))
}

/// The caller's results, newest first.
async fn get_my_results(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<PageQuery>,
) -> Result<Json<PageResponse<WodResult>>> {
    let page = state
        .ledger
        .get_user_history(
            &user.user_id,
            params.limit,
            params.cursor.as_deref(),
            state.deadline(),
        )
        .await?;
    Ok(Json(page.into()))
}

// ─── Administration ──────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct GrantAchievementRequest {
    #[validate(length(min = 1, max = 64))]
    pub achievement: String,
}

async fn grant_achievement(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Json(payload): Json<GrantAchievementRequest>,
) -> Result<Json<User>> {
    payload.validate()?;
    tracing::info!(
        admin = %admin.user_id,
        user_id = %user_id,
        achievement = %payload.achievement,
        "Granting achievement"
    );

    let user = state
        .users
        .grant_achievement(&user_id, &payload.achievement, state.deadline())
        .await?;
    Ok(Json(user))
}

/// Rebuild a user's stats from their full result history.
async fn recalculate_stats(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<StatsResponse>> {
    tracing::info!(admin = %admin.user_id, user_id = %user_id, "Recalculating stats");

    let stats = state
        .stats
        .recalculate(&user_id, chrono::Utc::now(), state.deadline())
        .await?;
    Ok(Json(stats.into()))
}
