// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers binding the callable surface of §6 onto `AdmissionApi` /
//! `StatusReader`. Not a hardened production surface: no auth, no
//! validation beyond what serde gives for free (§4.12).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::admission::CreateRideRequest;
use crate::domain::Verdict;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// `GET /api/v1/health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "running" })
}

/// `POST /api/v1/requests` — `create-request` (§6).
pub async fn create_request(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateRideRequest>,
) -> impl IntoResponse {
    match state.admission.create_and_dispatch(input).await {
        Ok(request) => Json(request).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptRequestBody {
    pub driver_id: String,
    pub eta_minutes: u32,
}

/// `POST /api/v1/requests/{id}/accept` — `accept-request` (§6). Driver
/// identity is carried in the body since authentication is out of scope (§1).
pub async fn accept_request(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
    Json(body): Json<AcceptRequestBody>,
) -> impl IntoResponse {
    match state.admission.respond(request_id, &body.driver_id, Verdict::Accept, Some(body.eta_minutes)).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclineRequestBody {
    pub driver_id: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// `POST /api/v1/requests/{id}/decline` — `decline-request` (§6).
pub async fn decline_request(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
    Json(body): Json<DeclineRequestBody>,
) -> impl IntoResponse {
    let _ = &body.reason;
    match state.admission.respond(request_id, &body.driver_id, Verdict::Decline, None).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => err.into_response(),
    }
}

/// `POST /api/v1/requests/{id}/cancel` — passenger-initiated cancel.
pub async fn cancel_request(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.admission.cancel(request_id).await {
        Ok(cancelled) => Json(serde_json::json!({ "cancelled": cancelled })).into_response(),
        Err(err) => err.into_response(),
    }
}

/// `GET /api/v1/requests/{id}/status` — `request-status` (§6).
pub async fn request_status(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
) -> impl IntoResponse {
    Json(state.status_reader.get_status(request_id).await)
}

/// `GET /api/v1/requests/{id}` — the stored canonical request, mostly useful
/// for manual exercising and scenario tests.
pub async fn get_request(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.ride_store.get(request_id).await {
        Some(request) => Json(request).into_response(),
        None => crate::error::DispatchError::Validation(format!("no ride request {request_id}")).into_response(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverLocationBody {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// `POST /api/v1/drivers/{id}/location` — `driver-location` (§6).
pub async fn driver_location(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<String>,
    Json(body): Json<DriverLocationBody>,
) -> impl IntoResponse {
    let _ = (&body.speed, &body.timestamp);
    state.presence.heartbeat(&driver_id, body.latitude, body.longitude).await;
    Json(serde_json::json!({ "ok": true })).into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverOnlineStatusBody {
    pub is_online: bool,
}

/// `PUT /api/v1/drivers/{id}/online-status` — `driver-online-status` (§6).
pub async fn driver_online_status(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<String>,
    Json(body): Json<DriverOnlineStatusBody>,
) -> impl IntoResponse {
    if !body.is_online {
        state.presence.mark_offline(&driver_id).await;
    }
    Json(serde_json::json!({ "ok": true })).into_response()
}

/// `GET /api/v1/drivers/nearby` — ambient helper exercising `PresenceIndex`
/// directly, for manual testing; not part of the normative callable surface.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_radius_km() -> f64 {
    5.0
}

fn default_limit() -> usize {
    10
}

pub async fn nearby_drivers(
    State(state): State<Arc<AppState>>,
    axum::extract::Query(query): axum::extract::Query<NearbyQuery>,
) -> impl IntoResponse {
    let candidates = state
        .presence
        .nearest(query.lat, query.lng, query.radius_km, query.limit, state.config.liveness_ttl())
        .await;
    Json(candidates.into_iter().map(|c| (c.driver_id, c.distance_km)).collect::<Vec<_>>())
}
