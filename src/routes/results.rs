// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! Result submission routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{DifficultyLevel, WodResult};
use crate::routes::users::StatsResponse;
use crate::services::NewResult;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/results", post(submit_result))
        .route("/api/results/{id}/reconcile", post(reconcile_result))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitResultRequest {
    /// Client-chosen id, for safe resubmission; generated when absent
    #[validate(length(min = 1, max = 64))]
    pub id: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub wod_id: String,
    pub level: DifficultyLevel,
    #[validate(range(max = 1_000_000))]
    pub score: u32,
    #[validate(range(max = 86_400))]
    pub time_seconds: Option<u32>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Record a result for the caller.
///
/// A 503 `stats_update_failed` response still means the result was stored;
/// its id is in the body and `/reconcile` finishes the stats update.
async fn submit_result(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SubmitResultRequest>,
) -> Result<(StatusCode, Json<WodResult>)> {
    payload.validate()?;

    let result = state
        .ledger
        .submit_result(
            NewResult {
                id: payload.id,
                wod_id: payload.wod_id,
                user_id: user.user_id,
                level: payload.level,
                score: payload.score,
                time_seconds: payload.time_seconds,
                notes: payload.notes,
            },
            state.deadline(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(result)))
}

/// Retry the stats update of a recorded result. Safe to call repeatedly.
async fn reconcile_result(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(result_id): Path<String>,
) -> Result<Json<StatsResponse>> {
    let deadline = state.deadline();
    let result = state.ledger.get_result(&result_id, deadline).await?;
    if result.user_id != user.user_id && !state.config.is_admin(&user.user_id) {
        return Err(AppError::Forbidden);
    }

    let stats = state.ledger.reconcile_result(&result_id, deadline).await?;
    Ok(Json(stats.into()))
}
