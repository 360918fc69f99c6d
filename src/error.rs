// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! Application error types with consistent API responses.

use crate::db::{InvalidCursor, StoreError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Administrator access required")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("WOD not found: {0}")]
    WodNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    /// The result was recorded but the user's stats were not updated.
    #[error("Result {result_id} recorded but stats update failed: {reason}")]
    StatsUpdateFailed { result_id: String, reason: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } | StoreError::RetriesExhausted { .. } => {
                AppError::Conflict(err.to_string())
            }
            StoreError::Timeout { .. } => AppError::Timeout(err.to_string()),
            StoreError::Serialization(_) | StoreError::Backend(_) => {
                AppError::Database(err.to_string())
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<InvalidCursor> for AppError {
    fn from(err: InvalidCursor) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut result_id = None;
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::WodNotFound(id) => (StatusCode::NOT_FOUND, "wod_not_found", Some(id.clone())),
            AppError::UserNotFound(id) => {
                (StatusCode::NOT_FOUND, "user_not_found", Some(id.clone()))
            }
            AppError::AlreadyExists(msg) => {
                (StatusCode::CONFLICT, "already_exists", Some(msg.clone()))
            }
            AppError::Conflict(msg) => {
                tracing::warn!(error = %msg, "Conflict");
                (StatusCode::CONFLICT, "conflict", Some(msg.clone()))
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", Some(msg.clone()))
            }
            AppError::Timeout(msg) => {
                tracing::warn!(error = %msg, "Request timed out");
                (StatusCode::GATEWAY_TIMEOUT, "timeout", None)
            }
            AppError::StatsUpdateFailed {
                result_id: id,
                reason,
            } => {
                tracing::error!(result_id = %id, error = %reason, "Stats update failed");
                result_id = Some(id.clone());
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "stats_update_failed",
                    Some("Result recorded; stats will be reconciled".to_string()),
                )
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
            result_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
