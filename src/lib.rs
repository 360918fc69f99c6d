// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! WOD Tracker: daily workouts, athlete results and rankings
//!
//! This crate provides the backend API for scheduling workouts of the day,
//! recording results against them, maintaining per-user statistics and
//! serving deterministic rankings.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::{Deadline, RetryPolicy, Store};
use services::{RankingEngine, ResultLedger, StatsAggregator, UserDirectory, WodCatalog};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub catalog: WodCatalog,
    pub ledger: ResultLedger,
    pub stats: StatsAggregator,
    pub rankings: RankingEngine,
    pub users: UserDirectory,
}

impl AppState {
    /// Wire every service onto one store.
    pub fn new(config: Config, store: Store) -> Self {
        let policy = RetryPolicy::new(config.stats_max_retries);
        let stats = StatsAggregator::new(store.clone(), policy);

        Self {
            catalog: WodCatalog::new(store.clone()),
            ledger: ResultLedger::new(store.clone(), stats.clone()),
            rankings: RankingEngine::new(store.clone()),
            users: UserDirectory::new(store, stats.clone(), policy),
            stats,
            config,
        }
    }

    /// Deadline for the store calls of one request.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.config.store_timeout)
    }
}
