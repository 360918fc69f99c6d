// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use wod_tracker::config::Config;
use wod_tracker::db::{FirestoreStore, MemoryStore, Store};
use wod_tracker::middleware::auth::create_jwt;
use wod_tracker::routes::create_router;
use wod_tracker::AppState;

/// Administrator id in `Config::default()`.
#[allow(dead_code)]
pub const ADMIN: &str = "admin";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a store on the Firestore emulator.
#[allow(dead_code)]
pub async fn test_firestore() -> Store {
    Store::new(
        FirestoreStore::new("test-project")
            .await
            .expect("Failed to connect to Firestore emulator"),
    )
}

/// Create a test app on a fresh in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with(Config::default(), Store::new(MemoryStore::new()))
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config, store: Store) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, store));
    (create_router(state.clone()), state)
}

/// Signed session token for `user_id` under the default test key.
#[allow(dead_code)]
pub fn token_for(user_id: &str) -> String {
    create_jwt(user_id, &Config::default().jwt_signing_key, 3600).unwrap()
}

/// Send a request as `user` (if any) and decode the JSON response body.
/// Empty bodies decode to `Value::Null`.
#[allow(dead_code)]
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token_for(user)));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Create `user_id`'s profile through the API.
#[allow(dead_code)]
pub async fn create_user(app: &Router, user_id: &str, box_name: &str, city: &str) {
    let (status, _) = send(
        app,
        Method::POST,
        "/api/users",
        Some(user_id),
        Some(serde_json::json!({
            "email": format!("{user_id}@example.com"),
            "name": user_id,
            "box": box_name,
            "country": "PE",
            "city": city,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "creating user {user_id}");
}

/// Schedule a WOD with an RX variant through the API, as the administrator.
#[allow(dead_code)]
pub async fn create_wod(app: &Router, date: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/wods",
        Some(ADMIN),
        Some(serde_json::json!({
            "date": format!("{date}T06:00:00Z"),
            "type": "ForTime",
            "title": "Fran",
            "time_limit": 600,
            "variants": {
                "RX": {
                    "level": "RX",
                    "movements": [{"name": "Thruster"}, {"name": "Pull-up"}],
                    "description": "21-15-9"
                }
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "creating WOD for {date}: {body}");
    body["id"].as_str().unwrap().to_string()
}
