// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! In-process document store.
//!
//! Used for local development (`STORE_BACKEND=memory`) and by the test
//! suite. Each collection lives behind one `DashMap` shard entry, so a
//! conditional put is checked and applied under that entry's lock.

use crate::db::document::{DocumentStore, Precondition, StoreError, Versioned};
use crate::db::query::Query;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct StoredDocument {
    data: Value,
    version: u64,
}

/// In-memory [`DocumentStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<DashMap<String, BTreeMap<String, StoredDocument>>>,
    clock: Arc<AtomicU64>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every operation by `latency`, to mimic a network round trip.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    async fn round_trip(&self) {
        match self.latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }
    }

    fn next_version(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Versioned<Value>>, StoreError> {
        self.round_trip().await;
        Ok(self.collections.get(collection).and_then(|docs| {
            docs.get(key).map(|doc| Versioned {
                data: doc.data.clone(),
                version: doc.version,
            })
        }))
    }

    async fn put(
        &self,
        collection: &str,
        key: &str,
        doc: Value,
        precondition: Precondition,
    ) -> Result<(), StoreError> {
        self.round_trip().await;
        let mut docs = self.collections.entry(collection.to_string()).or_default();

        let current = docs.get(key).map(|d| d.version);
        let allowed = match precondition {
            Precondition::None => true,
            Precondition::MustNotExist => current.is_none(),
            Precondition::Version(expected) => current == Some(expected),
        };
        if !allowed {
            return Err(StoreError::conflict(collection, key));
        }

        let version = self.next_version();
        docs.insert(key.to_string(), StoredDocument { data: doc, version });
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        self.round_trip().await;
        if let Some(mut docs) = self.collections.get_mut(collection) {
            docs.remove(key);
        }
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<Value>, StoreError> {
        self.round_trip().await;
        let Some(docs) = self.collections.get(query.collection) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<(Vec<Value>, &Value)> = docs
            .values()
            .map(|doc| &doc.data)
            .filter(|data| query.filters.iter().all(|f| f.matches(data)))
            .filter_map(|data| query.sort_key(data).map(|key| (key, data)))
            .filter(|(key, _)| match &query.start_after {
                Some(after) => query.compare_keys(key, after).is_gt(),
                None => true,
            })
            .collect();

        rows.sort_by(|(a, _), (b, _)| query.compare_keys(a, b));
        if query.limit > 0 {
            rows.truncate(query.limit as usize);
        }

        Ok(rows.into_iter().map(|(_, data)| data.clone()).collect())
    }
}
