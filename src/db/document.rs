// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! Document store contract shared by every backend.
//!
//! Documents are JSON objects addressed by `(collection, key)`. Every stored
//! document carries an opaque, backend-assigned version that changes on each
//! write; conditional writes compare against it.

use crate::db::query::Query;
use async_trait::async_trait;
use serde_json::Value;

/// A document together with the version it was read at.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub data: T,
    pub version: u64,
}

/// Write precondition for [`DocumentStore::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Unconditional write (create or replace).
    None,
    /// Create-only: fails with `Conflict` if the key is already taken.
    MustNotExist,
    /// Replace only if the stored version still matches.
    Version(u64),
}

/// Store-level errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Write precondition failed for {collection}/{key}")]
    Conflict { collection: String, key: String },

    #[error("Deadline exceeded during {operation}")]
    Timeout { operation: &'static str },

    #[error("Gave up on {collection}/{key} after {attempts} conflicting writes")]
    RetriesExhausted {
        collection: String,
        key: String,
        attempts: u32,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn conflict(collection: &str, key: &str) -> Self {
        Self::Conflict {
            collection: collection.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Single-document reads and writes plus ordered range queries.
///
/// No multi-document atomicity is offered. Implementations must make
/// conditional `put` atomic with respect to other writes of the same key.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document and its current version.
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Versioned<Value>>, StoreError>;

    /// Write a document, subject to `precondition`.
    async fn put(
        &self,
        collection: &str,
        key: &str,
        doc: Value,
        precondition: Precondition,
    ) -> Result<(), StoreError>;

    /// Remove a document. Deleting a missing key is not an error.
    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError>;

    /// Run an ordered range query.
    ///
    /// Documents missing any `order_by` field are excluded, matching
    /// Firestore semantics.
    async fn query(&self, query: &Query) -> Result<Vec<Value>, StoreError>;
}
