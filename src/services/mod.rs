// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! Services module - business logic layer.

pub mod catalog;
pub mod ledger;
pub mod ranking;
pub mod stats;
pub mod users;

pub use catalog::{NewWod, WodCatalog, WodEdit};
pub use ledger::{NewResult, ResultLedger};
pub use ranking::RankingEngine;
pub use stats::StatsAggregator;
pub use users::{NewUser, UserDirectory};

use crate::db::Cursor;
use crate::error::Result;

/// Upper bound on any page or ranking size.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Clamp a requested page size into `[1, MAX_PAGE_LIMIT]`.
pub fn page_limit(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT)
}

/// Decode an optional wire cursor for a query with `keys` sort keys.
pub(crate) fn decode_cursor(raw: Option<&str>, keys: usize) -> Result<Option<Cursor>> {
    raw.filter(|c| !c.is_empty())
        .map(|c| Cursor::decode(c, keys))
        .transpose()
        .map_err(Into::into)
}
