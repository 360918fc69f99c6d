// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! Typed store handle with per-call deadlines and optimistic updates.

use crate::db::document::{DocumentStore, Precondition, StoreError, Versioned};
use crate::db::query::{Cursor, Page, Query};
use rand::Rng;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Point in time after which a store call fails with `Timeout`.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    pub fn at(instant: Instant) -> Self {
        Self(instant)
    }

    pub fn instant(&self) -> Instant {
        self.0
    }
}

/// Bound on conditional-write retries and the pause between attempts.
///
/// The pause before retry `n` is drawn uniformly from
/// `[0, backoff × 2^n]`, so writers that lost the same round spread out
/// instead of colliding again.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Duration::from_millis(10),
        }
    }

    /// Upper bound of the pause before retry `attempt` (1-based).
    pub fn max_delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(1 << attempt.min(10))
    }

    pub(crate) fn delay(&self, attempt: u32) -> Duration {
        let cap = u64::try_from(self.max_delay(attempt).as_micros()).unwrap_or(u64::MAX);
        Duration::from_micros(rand::thread_rng().gen_range(0..=cap))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5)
    }
}

/// Cloneable handle to a document store backend.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn DocumentStore>,
}

impl Store {
    pub fn new(backend: impl DocumentStore + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    async fn within<T>(
        operation: &'static str,
        deadline: Deadline,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout_at(deadline.instant(), fut)
            .await
            .map_err(|_| StoreError::Timeout { operation })?
    }

    /// Fetch and decode one document.
    pub async fn get<T: DeserializeOwned>(
        &self,
        collection: &str,
        key: &str,
        deadline: Deadline,
    ) -> Result<Option<Versioned<T>>, StoreError> {
        let raw = Self::within("get", deadline, self.backend.get(collection, key)).await?;
        raw.map(|doc| {
            Ok(Versioned {
                data: serde_json::from_value(doc.data)?,
                version: doc.version,
            })
        })
        .transpose()
    }

    /// Encode and write one document.
    pub async fn put<T: Serialize>(
        &self,
        collection: &str,
        key: &str,
        doc: &T,
        precondition: Precondition,
        deadline: Deadline,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(doc)?;
        Self::within(
            "put",
            deadline,
            self.backend.put(collection, key, value, precondition),
        )
        .await
    }

    pub async fn delete(
        &self,
        collection: &str,
        key: &str,
        deadline: Deadline,
    ) -> Result<(), StoreError> {
        Self::within("delete", deadline, self.backend.delete(collection, key)).await
    }

    /// Run a query and decode every row.
    pub async fn query<T: DeserializeOwned>(
        &self,
        query: &Query,
        deadline: Deadline,
    ) -> Result<Vec<T>, StoreError> {
        let rows = Self::within("query", deadline, self.backend.query(query)).await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(StoreError::from))
            .collect()
    }

    /// Fetch one keyset page of `query`.
    ///
    /// Reads one row past `query.limit` to learn whether another page exists;
    /// the returned cursor is the sort key of the last row served.
    pub async fn query_page<T: DeserializeOwned>(
        &self,
        query: Query,
        cursor: Option<Cursor>,
        deadline: Deadline,
    ) -> Result<Page<T>, StoreError> {
        let limit = query.limit as usize;
        let fetch_limit = query.limit.saturating_add(1);
        let mut query = query.limit(fetch_limit);
        if let Some(Cursor(values)) = cursor {
            query = query.start_after(values);
        }

        let mut rows = Self::within("query", deadline, self.backend.query(&query)).await?;
        let has_more = rows.len() > limit;
        if has_more {
            rows.truncate(limit);
        }

        let next_cursor = if has_more {
            rows.last().and_then(|row| query.sort_key(row)).map(Cursor)
        } else {
            None
        };

        let items = rows
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(StoreError::from))
            .collect::<Result<Vec<T>, _>>()?;

        Ok(Page { items, next_cursor })
    }

    /// Optimistic read-modify-write of a single document.
    ///
    /// `mutate` receives the current document (if any) and returns the
    /// replacement, or `None` to leave the document untouched. The write is
    /// conditional on the version that was read; on conflict the whole cycle
    /// is re-run after a jittered pause, at most `policy.max_retries` extra
    /// times. Returns the document as it stands after the call.
    pub async fn update<T, F>(
        &self,
        collection: &str,
        key: &str,
        policy: RetryPolicy,
        deadline: Deadline,
        mut mutate: F,
    ) -> Result<Option<T>, StoreError>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(Option<&T>) -> Option<T>,
    {
        let mut attempt = 0;
        loop {
            let current = self.get::<T>(collection, key, deadline).await?;
            let (doc, precondition) = match current {
                Some(v) => (Some(v.data), Precondition::Version(v.version)),
                None => (None, Precondition::MustNotExist),
            };

            let Some(next) = mutate(doc.as_ref()) else {
                return Ok(doc);
            };

            match self.put(collection, key, &next, precondition, deadline).await {
                Ok(()) => return Ok(Some(next)),
                Err(StoreError::Conflict { .. }) if attempt < policy.max_retries => {
                    attempt += 1;
                    tracing::warn!(collection, key, attempt, "Write conflict, retrying");
                    tokio::time::sleep(policy.delay(attempt)).await;
                }
                Err(StoreError::Conflict { .. }) => {
                    return Err(StoreError::RetriesExhausted {
                        collection: collection.to_string(),
                        key: key.to_string(),
                        attempts: attempt + 1,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}
