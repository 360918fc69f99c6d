// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! Concurrent submissions for one user must not lose stats updates.

use std::sync::Arc;
use std::time::Duration;
use wod_tracker::config::Config;
use wod_tracker::db::{collections, Deadline, MemoryStore, Precondition, Store};
use wod_tracker::models::{DifficultyLevel, ExperienceLevel, Wod, WodType};
use wod_tracker::services::{NewResult, NewUser};
use wod_tracker::AppState;

mod common;

const NUM_CONCURRENT_RESULTS: u64 = 10;
const SCORE: u32 = 25;

fn deadline() -> Deadline {
    Deadline::after(Duration::from_secs(30))
}

async fn seed(state: &AppState, store: &Store, user_id: &str) -> String {
    state
        .users
        .create_user(
            NewUser {
                id: user_id.to_string(),
                email: format!("{user_id}@example.com"),
                name: "Race".to_string(),
                photo_url: None,
                box_name: "Norte".to_string(),
                country: "PE".to_string(),
                city: "Lima".to_string(),
                experience_level: ExperienceLevel::Advanced,
            },
            deadline(),
        )
        .await
        .expect("Failed to create test user");

    // Written directly so repeated emulator runs never collide on a date.
    let now = chrono::Utc::now();
    let wod = Wod {
        id: format!("race-{user_id}"),
        date: now,
        wod_type: WodType::Amrap,
        title: "Cindy".to_string(),
        description: String::new(),
        time_limit: Some(1200),
        variants: Default::default(),
        created_at: now,
        updated_at: now,
    };
    store
        .put(collections::WODS, &wod.id, &wod, Precondition::None, deadline())
        .await
        .expect("Failed to create test WOD");
    wod.id
}

async fn submit_concurrently(state: Arc<AppState>, user_id: &str, wod_id: &str) {
    let mut handles = vec![];

    for i in 0..NUM_CONCURRENT_RESULTS {
        let state = state.clone();
        let result = NewResult {
            id: Some(format!("{user_id}-race-{i}")),
            wod_id: wod_id.to_string(),
            user_id: user_id.to_string(),
            level: DifficultyLevel::Rx,
            score: SCORE,
            time_seconds: None,
            notes: None,
        };
        handles.push(tokio::spawn(async move {
            state.ledger.submit_result(result, deadline()).await
        }));
    }

    // Wait for all
    for handle in handles {
        handle
            .await
            .expect("Task join failed")
            .expect("Result submission failed");
    }
}

async fn assert_totals(state: &AppState, user_id: &str) {
    let stats = state
        .users
        .get_stats(user_id, deadline())
        .await
        .expect("Failed to fetch user stats");

    assert_eq!(
        stats.total_wods, NUM_CONCURRENT_RESULTS,
        "Total WOD count mismatch due to lost update"
    );
    assert_eq!(stats.total_points, NUM_CONCURRENT_RESULTS * u64::from(SCORE));
    assert_eq!(stats.processed_results.len() as u64, NUM_CONCURRENT_RESULTS);

    let user = state.users.get_user(user_id, deadline()).await.unwrap();
    assert_eq!(user.points, stats.total_points);
    assert_eq!(user.wod_count, stats.total_wods);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_in_memory() {
    // Store latency widens the read-to-write window so writers collide.
    // The default retry budget must absorb the burst.
    let store = Store::new(MemoryStore::with_latency(Duration::from_millis(2)));
    let (_, state) = common::create_test_app_with(Config::default(), store.clone());

    let wod_id = seed(&state, &store, "racer").await;
    submit_concurrently(state.clone(), "racer", &wod_id).await;
    assert_totals(&state, "racer").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_on_emulator() {
    require_emulator!();

    let store = common::test_firestore().await;
    let (_, state) = common::create_test_app_with(Config::default(), store.clone());

    let user_id = format!("racer-{}", uuid::Uuid::new_v4());
    let wod_id = seed(&state, &store, &user_id).await;
    submit_concurrently(state.clone(), &user_id, &wod_id).await;
    assert_totals(&state, &user_id).await;
}
