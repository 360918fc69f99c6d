// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! Ranking and leaderboard ordering, filtering and pagination.

use axum::http::{Method, StatusCode};
use axum::Router;
use serde_json::{json, Value};

mod common;

/// amy 100 (Norte, Lima), bea 150 (Norte, Cusco),
/// cai 100 (Sur, Lima), dan 50 (Sur, Cusco).
async fn seeded_app() -> (Router, String) {
    let (app, _) = common::create_test_app();
    let wod_id = common::create_wod(&app, "2026-03-02").await;

    for (user, box_name, city, score) in [
        ("amy", "Norte", "Lima", 100),
        ("bea", "Norte", "Cusco", 150),
        ("cai", "Sur", "Lima", 100),
        ("dan", "Sur", "Cusco", 50),
    ] {
        common::create_user(&app, user, box_name, city).await;
        let (status, body) = common::send(
            &app,
            Method::POST,
            "/api/results",
            Some(user),
            Some(json!({
                "id": format!("r-{user}"),
                "wod_id": wod_id,
                "level": "RX",
                "score": score,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "submitting for {user}: {body}");
    }

    (app, wod_id)
}

fn ids(body: &Value) -> Vec<String> {
    body["items"]
        .as_array()
        .expect("items array")
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_global_ranking_breaks_ties_by_id() {
    let (app, _) = seeded_app().await;

    let (status, body) =
        common::send(&app, Method::GET, "/api/rankings/global", Some("amy"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), ["bea", "amy", "cai", "dan"]);
    assert_eq!(body["items"][0]["points"], 150);
    assert_eq!(body["items"][0]["box"], "Norte");
    assert!(body["items"][0].get("email").is_none());
    assert!(body["next_cursor"].is_null());
}

#[tokio::test]
async fn test_global_ranking_is_stable_across_calls() {
    let (app, _) = seeded_app().await;

    let (_, first) =
        common::send(&app, Method::GET, "/api/rankings/global", Some("amy"), None).await;
    let (_, second) =
        common::send(&app, Method::GET, "/api/rankings/global", Some("dan"), None).await;

    assert_eq!(ids(&first), ids(&second));
}

#[tokio::test]
async fn test_cursor_walk_visits_every_user_once() {
    let (app, _) = seeded_app().await;

    let mut seen = Vec::new();
    let mut uri = "/api/rankings/global?limit=1".to_string();
    loop {
        let (status, body) = common::send(&app, Method::GET, &uri, Some("amy"), None).await;
        assert_eq!(status, StatusCode::OK);
        let page = ids(&body);
        assert_eq!(page.len(), 1);
        seen.extend(page);

        match body["next_cursor"].as_str() {
            Some(cursor) => uri = format!("/api/rankings/global?limit=1&cursor={cursor}"),
            None => break,
        }
    }

    assert_eq!(seen, ["bea", "amy", "cai", "dan"]);
}

#[tokio::test]
async fn test_limit_is_clamped_to_at_least_one() {
    let (app, _) = seeded_app().await;

    let (status, body) = common::send(
        &app,
        Method::GET,
        "/api/rankings/global?limit=0",
        Some("amy"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), ["bea"]);
    assert!(body["next_cursor"].is_string());
}

#[tokio::test]
async fn test_garbage_cursor_is_rejected() {
    let (app, _) = seeded_app().await;

    let (status, body) = common::send(
        &app,
        Method::GET,
        "/api/rankings/global?cursor=bm90LWpzb24",
        Some("amy"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_box_ranking_filters_by_box() {
    let (app, _) = seeded_app().await;

    let (status, body) = common::send(
        &app,
        Method::GET,
        "/api/rankings/box?box=Sur",
        Some("amy"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), ["cai", "dan"]);

    let (status, _) =
        common::send(&app, Method::GET, "/api/rankings/box", Some("amy"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_location_ranking_by_country_and_city() {
    let (app, _) = seeded_app().await;

    let (status, body) = common::send(
        &app,
        Method::GET,
        "/api/rankings/location?country=PE",
        Some("amy"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), ["bea", "amy", "cai", "dan"]);

    let (_, body) = common::send(
        &app,
        Method::GET,
        "/api/rankings/location?country=PE&city=Lima",
        Some("amy"),
        None,
    )
    .await;
    assert_eq!(ids(&body), ["amy", "cai"]);

    let (_, body) = common::send(
        &app,
        Method::GET,
        "/api/rankings/location?country=CL",
        Some("amy"),
        None,
    )
    .await;
    assert!(ids(&body).is_empty());

    let (status, _) = common::send(
        &app,
        Method::GET,
        "/api/rankings/location?city=Lima",
        Some("amy"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_leaderboard_orders_by_score_then_result_id() {
    let (app, wod_id) = seeded_app().await;

    let (status, body) = common::send(
        &app,
        Method::GET,
        &format!("/api/leaderboard?wod_id={wod_id}"),
        Some("amy"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), ["r-bea", "r-amy", "r-cai", "r-dan"]);
    assert_eq!(body["items"][0]["user_id"], "bea");

    let (_, body) = common::send(
        &app,
        Method::GET,
        &format!("/api/leaderboard?wod_id={wod_id}&level=RX&limit=2"),
        Some("amy"),
        None,
    )
    .await;
    assert_eq!(ids(&body), ["r-bea", "r-amy"]);
    let cursor = body["next_cursor"].as_str().unwrap().to_string();

    let (_, body) = common::send(
        &app,
        Method::GET,
        &format!("/api/leaderboard?wod_id={wod_id}&level=RX&limit=2&cursor={cursor}"),
        Some("amy"),
        None,
    )
    .await;
    assert_eq!(ids(&body), ["r-cai", "r-dan"]);
    assert!(body["next_cursor"].is_null());
}

#[tokio::test]
async fn test_leaderboard_is_per_level() {
    let (app, wod_id) = seeded_app().await;

    let (status, body) = common::send(
        &app,
        Method::GET,
        &format!("/api/leaderboard?wod_id={wod_id}&level=Beginner"),
        Some("amy"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(ids(&body).is_empty());
}

#[tokio::test]
async fn test_rankings_require_authentication() {
    let (app, _) = common::create_test_app();

    let (status, _) = common::send(&app, Method::GET, "/api/rankings/global", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
