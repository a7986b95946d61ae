// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Repeated paid confirmations (double taps, retries) collapse into one
//! check-in and one payment when they carry the same idempotency key.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use trini213::models::{GymStatus, Role};

mod common;
use common::{create_test_app, qr_for, seed_gym, seed_user, send, token_for};

#[tokio::test]
async fn test_same_key_replays_first_confirmation() {
    let (app, state) = create_test_app();
    let owner = seed_user(&state, "owner", Role::GymOwner).await;
    let gym = seed_gym(&state, &owner, "Atlas Fit", GymStatus::Active).await;
    let member = seed_user(&state, "walkin", Role::Member).await;
    let token = token_for(&state, &owner);
    let body = json!({"qr_code": qr_for(&member), "idempotency_key": "tap-42"});

    let (status, first) = send(&app, "POST", "/api/check-ins/paid", Some(&token), Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["replayed"], false);

    let (status, second) = send(&app, "POST", "/api/check-ins/paid", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["replayed"], true);
    assert_eq!(second["check_in"]["id"], first["check_in"]["id"]);
    assert_eq!(second["payment"]["id"], first["payment"]["id"]);

    assert_eq!(state.db.check_ins_for_gym(&gym.id).await.unwrap().len(), 1);
    assert_eq!(
        state
            .db
            .single_visit_payments_for_user(&member.email)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_key_accepted_from_header() {
    let (app, state) = create_test_app();
    let owner = seed_user(&state, "owner", Role::GymOwner).await;
    let gym = seed_gym(&state, &owner, "Atlas Fit", GymStatus::Active).await;
    let member = seed_user(&state, "walkin", Role::Member).await;
    let token = token_for(&state, &owner);

    let mut statuses = vec![];
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/check-ins/paid")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .header(header::CONTENT_TYPE, "application/json")
                    .header("Idempotency-Key", "hdr-7")
                    .body(Body::from(json!({"qr_code": qr_for(&member)}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        statuses.push(response.status());
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["check_in"]["idempotency_key"], "hdr-7");
    }

    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::OK]);
    assert_eq!(state.db.check_ins_for_gym(&gym.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_without_key_each_confirmation_is_recorded() {
    let (app, state) = create_test_app();
    let owner = seed_user(&state, "owner", Role::GymOwner).await;
    let gym = seed_gym(&state, &owner, "Atlas Fit", GymStatus::Active).await;
    let member = seed_user(&state, "walkin", Role::Member).await;
    let token = token_for(&state, &owner);
    let body = json!({"qr_code": qr_for(&member)});

    for _ in 0..2 {
        let (status, paid) = send(&app, "POST", "/api/check-ins/paid", Some(&token), Some(body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(paid["replayed"], false);
    }

    assert_eq!(state.db.check_ins_for_gym(&gym.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_key_reused_for_another_member_conflicts() {
    let (app, state) = create_test_app();
    let owner = seed_user(&state, "owner", Role::GymOwner).await;
    seed_gym(&state, &owner, "Atlas Fit", GymStatus::Active).await;
    let first = seed_user(&state, "first", Role::Member).await;
    let second = seed_user(&state, "second", Role::Member).await;
    let token = token_for(&state, &owner);

    let (status, _) = send(
        &app,
        "POST",
        "/api/check-ins/paid",
        Some(&token),
        Some(json!({"qr_code": qr_for(&first), "idempotency_key": "shared"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "POST",
        "/api/check-ins/paid",
        Some(&token),
        Some(json!({"qr_code": qr_for(&second), "idempotency_key": "shared"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_same_key_at_different_gyms_is_distinct() {
    let (app, state) = create_test_app();
    let owner = seed_user(&state, "owner", Role::GymOwner).await;
    let first_gym = seed_gym(&state, &owner, "Atlas Fit", GymStatus::Active).await;
    let second_gym = seed_gym(&state, &owner, "Atlas Fit Oran", GymStatus::Active).await;
    let member = seed_user(&state, "walkin", Role::Member).await;
    let token = token_for(&state, &owner);

    for gym in [&first_gym, &second_gym] {
        let (status, paid) = send(
            &app,
            "POST",
            "/api/check-ins/paid",
            Some(&token),
            Some(json!({"qr_code": qr_for(&member), "gym_id": gym.id, "idempotency_key": "k1"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(paid["check_in"]["gym_id"], gym.id.as_str());
    }
}
