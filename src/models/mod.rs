// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! Data models for the application.

pub mod stats;
pub mod user;
pub mod wod;

pub use stats::UserStats;
pub use user::{ExperienceLevel, User};
pub use wod::{DifficultyLevel, Movement, Wod, WodResult, WodType, WodVariant};
