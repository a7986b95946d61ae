// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Support chat: assistant replies, human hand-off and admin replies.

use axum::http::StatusCode;
use serde_json::json;
use trini213::models::Role;
use trini213::services::assistant::CANNED_REPLY;
use trini213::services::chat::HUMAN_HANDOFF_NOTICE;

mod common;
use common::{create_test_app, seed_user, send, token_for};

#[tokio::test]
async fn test_first_message_opens_session_with_assistant_reply() {
    let (app, state) = create_test_app();
    let member = seed_user(&state, "member", Role::Member).await;
    let token = token_for(&state, &member);

    let (_, empty) = send(&app, "GET", "/api/chat/session", Some(&token), None).await;
    assert!(empty["session"].is_null());

    let (status, sent) = send(
        &app,
        "POST",
        "/api/chat/messages",
        Some(&token),
        Some(json!({"message": "How much is the Royal plan?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["session"]["status"], "active_ai");
    assert_eq!(sent["message"]["sender_type"], "user");
    assert_eq!(sent["reply"]["sender_type"], "ai");
    assert_eq!(sent["reply"]["message"], CANNED_REPLY);
    let session_id = sent["session"]["id"].as_str().unwrap().to_string();

    // A second message stays in the same session
    let (_, again) = send(
        &app,
        "POST",
        "/api/chat/messages",
        Some(&token),
        Some(json!({"message": "And the Classic plan?"})),
    )
    .await;
    assert_eq!(again["session"]["id"], session_id.as_str());

    let (status, messages) = send(
        &app,
        "GET",
        &format!("/api/chat/sessions/{}/messages", session_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let senders: Vec<&str> = messages
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["sender_type"].as_str().unwrap())
        .collect();
    assert_eq!(senders, vec!["user", "ai", "user", "ai"]);
}

#[tokio::test]
async fn test_human_handoff_and_admin_reply() {
    let (app, state) = create_test_app();
    let member = seed_user(&state, "member", Role::Member).await;
    let admin = seed_user(&state, "admin", Role::Admin).await;
    let token = token_for(&state, &member);
    let admin_token = token_for(&state, &admin);

    let (_, sent) = send(
        &app,
        "POST",
        "/api/chat/messages",
        Some(&token),
        Some(json!({"message": "My QR code does not scan"})),
    )
    .await;
    let session_id = sent["session"]["id"].as_str().unwrap().to_string();
    let last_seen = sent["reply"]["timestamp"].as_str().unwrap().to_string();

    let (status, session) = send(
        &app,
        "POST",
        &format!("/api/chat/sessions/{}/human", session_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["status"], "active_human");

    // Admin queue
    let (status, queue) = send(&app, "GET", "/api/chat/sessions", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue.as_array().unwrap().len(), 1);
    let (status, _) = send(&app, "GET", "/api/chat/sessions", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // No assistant reply once a human has taken over
    let (_, sent) = send(
        &app,
        "POST",
        "/api/chat/messages",
        Some(&token),
        Some(json!({"message": "Hello?"})),
    )
    .await;
    assert!(sent["reply"].is_null());

    let (status, reply) = send(
        &app,
        "POST",
        &format!("/api/chat/sessions/{}/reply", session_id),
        Some(&admin_token),
        Some(json!({"message": "Please update the app and try again."})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["sender_type"], "admin");

    // Polling from the last seen message
    let uri = format!(
        "/api/chat/sessions/{}/messages?since={}",
        session_id,
        last_seen.replace('+', "%2B")
    );
    let (status, new_messages) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let texts: Vec<&str> = new_messages
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["message"].as_str().unwrap())
        .collect();
    assert_eq!(
        texts,
        vec![
            HUMAN_HANDOFF_NOTICE,
            "Hello?",
            "Please update the app and try again."
        ]
    );
}

#[tokio::test]
async fn test_other_members_cannot_read_session() {
    let (app, state) = create_test_app();
    let member = seed_user(&state, "member", Role::Member).await;
    let snoop = seed_user(&state, "snoop", Role::Member).await;

    let (_, sent) = send(
        &app,
        "POST",
        "/api/chat/messages",
        Some(&token_for(&state, &member)),
        Some(json!({"message": "private question"})),
    )
    .await;
    let session_id = sent["session"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/chat/sessions/{}/messages", session_id),
        Some(&token_for(&state, &snoop)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_closed_session_replaced_by_new_one() {
    let (app, state) = create_test_app();
    let member = seed_user(&state, "member", Role::Member).await;
    let token = token_for(&state, &member);

    let (_, sent) = send(
        &app,
        "POST",
        "/api/chat/messages",
        Some(&token),
        Some(json!({"message": "first"})),
    )
    .await;
    let first_id = sent["session"]["id"].as_str().unwrap().to_string();

    let (status, closed) = send(
        &app,
        "POST",
        &format!("/api/chat/sessions/{}/close", first_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["status"], "closed");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/chat/sessions/{}/human", first_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, current) = send(&app, "GET", "/api/chat/session", Some(&token), None).await;
    assert!(current["session"].is_null());

    let (_, sent) = send(
        &app,
        "POST",
        "/api/chat/messages",
        Some(&token),
        Some(json!({"message": "second"})),
    )
    .await;
    assert_ne!(sent["session"]["id"], first_id.as_str());
}

#[tokio::test]
async fn test_blank_message_rejected() {
    let (app, state) = create_test_app();
    let member = seed_user(&state, "member", Role::Member).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/chat/messages",
        Some(&token_for(&state, &member)),
        Some(json!({"message": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_since_rejected() {
    let (app, state) = create_test_app();
    let member = seed_user(&state, "member", Role::Member).await;
    let token = token_for(&state, &member);
    let (_, sent) = send(
        &app,
        "POST",
        "/api/chat/messages",
        Some(&token),
        Some(json!({"message": "hi"})),
    )
    .await;
    let session_id = sent["session"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/chat/sessions/{}/messages?since=yesterday", session_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
