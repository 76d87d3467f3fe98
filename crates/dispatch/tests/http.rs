// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the dispatch engine's demo HTTP transport.
//!
//! Uses `axum_test::TestServer` — no real TCP needed.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use ride_dispatch::config::DispatchConfig;
use ride_dispatch::ports::{InMemoryRideStore, InMemoryUserStore, RecordingPushTransport, UserRecord};
use ride_dispatch::state::AppState;
use ride_dispatch::transport::build_router;

async fn test_server(driver_ids: &[&str]) -> (TestServer, Arc<RecordingPushTransport>) {
    let users = InMemoryUserStore::new();
    users
        .upsert(UserRecord { user_id: "p1".into(), display_name: "Alice".into(), push_credential: Some("tok-p1".into()) })
        .await;
    for id in driver_ids {
        users
            .upsert(UserRecord {
                user_id: (*id).to_owned(),
                display_name: (*id).to_owned(),
                push_credential: Some(format!("tok-{id}")),
            })
            .await;
    }

    let transport = Arc::new(RecordingPushTransport::new());
    let config = DispatchConfig { offer_timeout_seconds: 1, sweeper_interval_ms: 50, ..DispatchConfig::default() };
    let state = AppState::with_ports(
        config,
        CancellationToken::new(),
        Arc::new(users),
        Arc::new(InMemoryRideStore::new()),
        transport.clone(),
    );
    let server = TestServer::new(build_router(state)).expect("create test server");
    (server, transport)
}

fn create_body() -> serde_json::Value {
    json!({
        "passengerId": "p1",
        "passengerName": "Alice",
        "passengerContact": "+1-555-0100",
        "pickup": { "lat": 40.7128, "lng": -74.0060, "address": "pickup" },
        "dropoff": { "lat": 40.8, "lng": -74.1, "address": "dropoff" },
        "estimatedDistanceKm": 5.0,
        "estimatedDurationMin": 12.0,
        "proposedFare": 15.0,
    })
}

#[tokio::test]
async fn health_reports_running() {
    let (server, _transport) = test_server(&[]).await;
    let response = server.get("/api/v1/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "running" }));
}

#[tokio::test]
async fn create_request_returns_pending_and_offers_nearest_driver() {
    let (server, transport) = test_server(&["d1"]).await;
    server
        .post("/api/v1/drivers/d1/location")
        .json(&json!({ "latitude": 40.7129, "longitude": -74.0061 }))
        .await
        .assert_status_ok();

    let response = server.post("/api/v1/requests").json(&create_body()).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "pending");
    let request_id = body["id"].as_str().unwrap().to_owned();

    let mut status = "pending".to_owned();
    for _ in 0..50 {
        if transport.sent_to("tok-d1").await.len() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(transport.sent_to("tok-d1").await.len(), 1);

    let status_response = server.get(&format!("/api/v1/requests/{request_id}/status")).await;
    status_response.assert_status_ok();
    let status_body: serde_json::Value = status_response.json();
    status = status_body["status"].as_str().unwrap().to_owned();
    assert_eq!(status, "pending");
}

#[tokio::test]
async fn accept_then_status_reflects_assigned_driver() {
    let (server, _transport) = test_server(&["d1"]).await;
    server
        .post("/api/v1/drivers/d1/location")
        .json(&json!({ "latitude": 40.7129, "longitude": -74.0061 }))
        .await
        .assert_status_ok();

    let create_response = server.post("/api/v1/requests").json(&create_body()).await;
    let request_id = create_response.json::<serde_json::Value>()["id"].as_str().unwrap().to_owned();

    // Give the background admit task time to make d1 the current offeree.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let accept_response = server
        .post(&format!("/api/v1/requests/{request_id}/accept"))
        .json(&json!({ "driverId": "d1", "etaMinutes": 7 }))
        .await;
    accept_response.assert_status_ok();
    let outcome: serde_json::Value = accept_response.json();
    assert_eq!(outcome["applied"], true);

    let status_response = server.get(&format!("/api/v1/requests/{request_id}/status")).await;
    let status_body: serde_json::Value = status_response.json();
    assert_eq!(status_body["status"], "accepted");
    assert_eq!(status_body["driverId"], "d1");
    assert_eq!(status_body["estimatedArrivalMinutes"], 7);
}

#[tokio::test]
async fn decline_from_wrong_driver_is_rejected_not_errored() {
    let (server, _transport) = test_server(&["d1", "d2"]).await;
    server
        .post("/api/v1/drivers/d1/location")
        .json(&json!({ "latitude": 40.7129, "longitude": -74.0061 }))
        .await
        .assert_status_ok();
    server
        .post("/api/v1/drivers/d2/location")
        .json(&json!({ "latitude": 40.7200, "longitude": -74.0200 }))
        .await
        .assert_status_ok();

    let create_response = server.post("/api/v1/requests").json(&create_body()).await;
    let request_id = create_response.json::<serde_json::Value>()["id"].as_str().unwrap().to_owned();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let decline_response = server
        .post(&format!("/api/v1/requests/{request_id}/decline"))
        .json(&json!({ "driverId": "d2" }))
        .await;
    decline_response.assert_status_ok();
    let outcome: serde_json::Value = decline_response.json();
    assert_eq!(outcome["applied"], false);
}

#[tokio::test]
async fn cancel_request_marks_cancelled() {
    let (server, _transport) = test_server(&[]).await;
    let create_response = server.post("/api/v1/requests").json(&create_body()).await;
    let request_id = create_response.json::<serde_json::Value>()["id"].as_str().unwrap().to_owned();

    let cancel_response = server.post(&format!("/api/v1/requests/{request_id}/cancel")).await;
    cancel_response.assert_status_ok();
    let outcome: serde_json::Value = cancel_response.json();
    assert_eq!(outcome["cancelled"], true);

    let stored_response = server.get(&format!("/api/v1/requests/{request_id}")).await;
    let stored: serde_json::Value = stored_response.json();
    assert_eq!(stored["status"], "cancelled");
}

#[tokio::test]
async fn unknown_request_status_is_not_found_equivalent_pending() {
    let (server, _transport) = test_server(&[]).await;
    let response = server.get(&format!("/api/v1/requests/{}/status", uuid::Uuid::new_v4())).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn get_request_for_unknown_id_is_a_validation_error() {
    let (server, _transport) = test_server(&[]).await;
    let response = server.get(&format!("/api/v1/requests/{}", uuid::Uuid::new_v4())).await;
    response.assert_status(StatusCode::BAD_REQUEST);
}
