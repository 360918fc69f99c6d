// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! WOD catalog routes.

use crate::error::{AppError, Result};
use crate::models::{DifficultyLevel, Wod, WodType, WodVariant};
use crate::routes::{PageQuery, PageResponse};
use crate::services::{NewWod, WodEdit};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/wods", get(get_wod_by_date))
        .route("/api/wods/list", get(list_wods))
        .route("/api/wods/{id}", get(get_wod))
}

/// Scheduling and editing are restricted to administrators.
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/wods", post(create_wod))
        .route("/api/wods/{id}", put(update_wod).delete(delete_wod))
}

#[derive(Debug, Deserialize)]
struct WodByDateQuery {
    /// `YYYY-MM-DD`; defaults to today (UTC)
    date: Option<String>,
}

/// Get the WOD scheduled for a date.
async fn get_wod_by_date(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WodByDateQuery>,
) -> Result<Json<Wod>> {
    let date = match params.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            AppError::Validation("Invalid 'date' parameter: expected YYYY-MM-DD".to_string())
        })?,
        None => Utc::now().date_naive(),
    };

    let wod = state.catalog.get_wod_by_date(date, state.deadline()).await?;
    Ok(Json(wod))
}

async fn get_wod(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Wod>> {
    let wod = state.catalog.get_wod(&id, state.deadline()).await?;
    Ok(Json(wod))
}

/// WODs newest first.
async fn list_wods(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageQuery>,
) -> Result<Json<PageResponse<Wod>>> {
    let page = state
        .catalog
        .list_wods(params.limit, params.cursor.as_deref(), state.deadline())
        .await?;
    Ok(Json(page.into()))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWodRequest {
    #[validate(length(min = 1, max = 64))]
    pub id: Option<String>,
    /// Any instant on the scheduled day (RFC3339)
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub wod_type: WodType,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
    /// Time cap in seconds
    #[validate(range(min = 1, max = 86_400))]
    pub time_limit: Option<u32>,
    #[serde(default)]
    pub variants: BTreeMap<DifficultyLevel, WodVariant>,
}

async fn create_wod(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateWodRequest>,
) -> Result<(StatusCode, Json<Wod>)> {
    payload.validate()?;
    check_variant_levels(&payload.variants)?;

    let wod = state
        .catalog
        .create_daily_wod(
            NewWod {
                id: payload.id,
                date: payload.date,
                wod_type: payload.wod_type,
                title: payload.title,
                description: payload.description,
                time_limit: payload.time_limit,
                variants: payload.variants,
            },
            state.deadline(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(wod)))
}

/// Each variant must sit under its own level.
fn check_variant_levels(variants: &BTreeMap<DifficultyLevel, WodVariant>) -> Result<()> {
    match variants.iter().find(|(key, variant)| **key != variant.level) {
        Some((key, variant)) => Err(AppError::Validation(format!(
            "Variant under {} declares level {}",
            key.as_str(),
            variant.level.as_str()
        ))),
        None => Ok(()),
    }
}

/// Full replacement of the editable fields; id and date are fixed.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateWodRequest {
    #[serde(rename = "type")]
    pub wod_type: WodType,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
    #[validate(range(min = 1, max = 86_400))]
    pub time_limit: Option<u32>,
    #[serde(default)]
    pub variants: BTreeMap<DifficultyLevel, WodVariant>,
}

async fn update_wod(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateWodRequest>,
) -> Result<Json<Wod>> {
    payload.validate()?;
    check_variant_levels(&payload.variants)?;

    let wod = state
        .catalog
        .update_wod(
            &id,
            WodEdit {
                wod_type: payload.wod_type,
                title: payload.title,
                description: payload.description,
                time_limit: payload.time_limit,
                variants: payload.variants,
            },
            state.deadline(),
        )
        .await?;

    Ok(Json(wod))
}

async fn delete_wod(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.catalog.delete_wod(&id, state.deadline()).await?;
    Ok(StatusCode::NO_CONTENT)
}
