// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! Firestore-backed [`DocumentStore`].
//!
//! Document versions are the Firestore `update_time` in nanoseconds since the
//! epoch; conditional writes are sent with an `UpdateTime` precondition, and
//! create-only writes with `Exists(false)`.

use crate::db::document::{DocumentStore, Precondition, StoreError, Versioned};
use crate::db::query::{Direction, Filter, FilterOp, Query};
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::select_filter_builder::FirestoreQueryFilterBuilder;
use firestore::{FirestoreQueryDirection, FirestoreQueryFilter, FirestoreWritePrecondition};
use serde_json::Value;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: firestore::FirestoreDb,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Backend(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }
}

fn backend(e: FirestoreError) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Precondition failures come back as conflict, not-found (update time on a
/// deleted doc) or a FAILED_PRECONDITION database error depending on the case.
fn is_precondition_failure(e: &FirestoreError) -> bool {
    match e {
        FirestoreError::DataConflictError(_) | FirestoreError::DataNotFoundError(_) => true,
        other => {
            let msg = other.to_string();
            msg.contains("FAILED_PRECONDITION") || msg.contains("FailedPrecondition")
        }
    }
}

fn version_to_precondition(version: u64) -> FirestoreWritePrecondition {
    FirestoreWritePrecondition::UpdateTime(chrono::DateTime::from_timestamp_nanos(
        version as i64,
    ))
}

fn condition(
    q: &FirestoreQueryFilterBuilder,
    field: &str,
    op: FilterOp,
    value: &Value,
) -> Option<FirestoreQueryFilter> {
    let f = q.field(field);
    let value = value.clone();
    match op {
        FilterOp::Eq => f.eq(value),
        FilterOp::LessThan => f.less_than(value),
        FilterOp::LessThanOrEqual => f.less_than_or_equal(value),
        FilterOp::GreaterThan => f.greater_than(value),
        FilterOp::GreaterThanOrEqual => f.greater_than_or_equal(value),
    }
}

/// Keyset condition "strictly after `after` in query order":
/// OR over i of (k1 == v1 AND .. AND k(i-1) == v(i-1) AND ki beyond vi).
fn start_after_condition(
    q: &FirestoreQueryFilterBuilder,
    query: &Query,
    after: &[Value],
) -> Option<FirestoreQueryFilter> {
    let branches: Vec<_> = (0..query.order_by.len().min(after.len()))
        .map(|i| {
            let mut terms: Vec<_> = query.order_by[..i]
                .iter()
                .zip(after)
                .map(|(o, v)| condition(q, &o.field, FilterOp::Eq, v))
                .collect();
            let order = &query.order_by[i];
            let op = match order.direction {
                Direction::Ascending => FilterOp::GreaterThan,
                Direction::Descending => FilterOp::LessThan,
            };
            terms.push(condition(q, &order.field, op, &after[i]));
            q.for_all(terms)
        })
        .collect();
    q.for_any(branches)
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Versioned<Value>>, StoreError> {
        let doc = self
            .client
            .fluent()
            .select()
            .by_id_in(collection)
            .one(key)
            .await
            .map_err(backend)?;

        let Some(doc) = doc else {
            return Ok(None);
        };

        let version = doc
            .update_time
            .as_ref()
            .map(|t| (t.seconds as u64) * 1_000_000_000 + t.nanos as u64)
            .ok_or_else(|| StoreError::Backend(format!("{collection}/{key} has no update time")))?;
        let data: Value = firestore::FirestoreDb::deserialize_doc_to(&doc)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        Ok(Some(Versioned { data, version }))
    }

    async fn put(
        &self,
        collection: &str,
        key: &str,
        doc: Value,
        precondition: Precondition,
    ) -> Result<(), StoreError> {
        let builder = self.client.fluent().update().in_col(collection);
        let builder = match precondition {
            Precondition::None => builder,
            Precondition::MustNotExist => {
                builder.precondition(FirestoreWritePrecondition::Exists(false))
            }
            Precondition::Version(version) => builder.precondition(version_to_precondition(version)),
        };

        let result: Result<(), FirestoreError> =
            builder.document_id(key).object(&doc).execute().await;

        match result {
            Ok(()) => Ok(()),
            Err(e) if precondition != Precondition::None && is_precondition_failure(&e) => {
                tracing::debug!(collection, key, error = %e, "Write precondition failed");
                Err(StoreError::conflict(collection, key))
            }
            Err(e) => Err(backend(e)),
        }
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        self.client
            .fluent()
            .delete()
            .from(collection)
            .document_id(key)
            .execute()
            .await
            .map_err(backend)
    }

    async fn query(&self, query: &Query) -> Result<Vec<Value>, StoreError> {
        let filters: Vec<Filter> = query.filters.clone();
        let after = query.start_after.clone();

        let select = self.client.fluent().select().from(query.collection).filter(|q| {
            let mut terms: Vec<_> = filters
                .iter()
                .map(|f| condition(&q, &f.field, f.op, &f.value))
                .collect();
            if let Some(after) = &after {
                terms.push(start_after_condition(&q, query, after));
            }
            q.for_all(terms)
        });

        let order: Vec<(&str, FirestoreQueryDirection)> = query
            .order_by
            .iter()
            .map(|o| {
                let direction = match o.direction {
                    Direction::Ascending => FirestoreQueryDirection::Ascending,
                    Direction::Descending => FirestoreQueryDirection::Descending,
                };
                (o.field.as_str(), direction)
            })
            .collect();

        let select = select.order_by(order);
        let select = if query.limit > 0 {
            select.limit(query.limit)
        } else {
            select
        };

        select.obj().query().await.map_err(backend)
    }
}
