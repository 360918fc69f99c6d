// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! Database layer: a small document-store contract with Firestore and
//! in-memory backends.

pub mod document;
pub mod firestore;
pub mod memory;
pub mod query;
pub mod store;

pub use document::{DocumentStore, Precondition, StoreError, Versioned};
pub use firestore::FirestoreStore;
pub use memory::MemoryStore;
pub use query::{Cursor, Direction, FilterOp, InvalidCursor, Page, Query};
pub use store::{Deadline, RetryPolicy, Store};

/// Collection names as constants.
pub mod collections {
    pub const WODS: &str = "wods";
    /// One claim per scheduled date (keyed `YYYY-MM-DD`)
    pub const WOD_DATES: &str = "wod_dates";
    pub const WOD_RESULTS: &str = "wod_results";
    pub const USERS: &str = "users";
    /// User stats aggregates (keyed by user id)
    pub const USER_STATS: &str = "user_stats";
}
