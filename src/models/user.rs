// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! User profile model for storage and API.

use crate::time_utils::rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ExperienceLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
    Elite,
}

/// User profile stored in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct User {
    /// Identity-provider subject (also used as document ID)
    pub id: String,
    pub email: String,
    /// Display name
    pub name: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    /// Affiliate gym the athlete trains at
    #[serde(rename = "box", default)]
    pub box_name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub experience_level: ExperienceLevel,

    // ─── Ranking Fields ──────────────────────────────────────────
    /// Mirrors `UserStats::total_points`; only ever raised outside a recalculation
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub points: u64,
    /// Mirrors `UserStats::total_wods`
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub wod_count: u64,
    #[serde(default)]
    pub achievements: BTreeSet<String>,

    // ─── Metadata ────────────────────────────────────────────────
    #[serde(with = "rfc3339")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[serde(with = "rfc3339")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}
