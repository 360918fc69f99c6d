// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! Workout-of-the-day and result models.

use crate::time_utils::rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Scoring style of a WOD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum WodType {
    ForTime,
    #[serde(rename = "AMRAP")]
    Amrap,
}

/// Scaling level a WOD variant (and a result) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum DifficultyLevel {
    #[serde(rename = "RX")]
    Rx,
    Advanced,
    Intermediate,
    Beginner,
}

impl DifficultyLevel {
    /// Stored string form, as used in query filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyLevel::Rx => "RX",
            DifficultyLevel::Advanced => "Advanced",
            DifficultyLevel::Intermediate => "Intermediate",
            DifficultyLevel::Beginner => "Beginner",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Movement {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub video_url: Option<String>,
}

/// Movements prescribed for one difficulty level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WodVariant {
    pub level: DifficultyLevel,
    #[serde(default)]
    pub movements: Vec<Movement>,
    #[serde(default)]
    pub description: String,
}

/// A workout of the day. At most one exists per UTC calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Wod {
    /// Document ID
    pub id: String,
    /// Midnight UTC of the day this WOD is scheduled for
    #[serde(with = "rfc3339")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub wod_type: WodType,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Time cap in seconds (informational)
    #[serde(default)]
    pub time_limit: Option<u32>,
    #[serde(default)]
    pub variants: BTreeMap<DifficultyLevel, WodVariant>,
    #[serde(with = "rfc3339")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[serde(with = "rfc3339")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}

impl Wod {
    /// Whether a result at `level` can be recorded against this WOD.
    ///
    /// A WOD without variants accepts every level.
    pub fn accepts_level(&self, level: DifficultyLevel) -> bool {
        self.variants.is_empty() || self.variants.contains_key(&level)
    }
}

/// One athlete's recorded result for a WOD. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WodResult {
    /// Document ID
    pub id: String,
    pub wod_id: String,
    pub user_id: String,
    pub level: DifficultyLevel,
    /// Higher is better
    pub score: u32,
    #[serde(default)]
    pub time_seconds: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(with = "rfc3339")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[serde(with = "rfc3339")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}
