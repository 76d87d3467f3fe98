// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin HTTP demo transport for the dispatch engine (C13, §4.12).

pub mod http;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

/// Build the axum `Router` exposing the callable surface of §6.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(http::health))
        .route("/api/v1/requests", post(http::create_request))
        .route("/api/v1/requests/{id}", get(http::get_request))
        .route("/api/v1/requests/{id}/status", get(http::request_status))
        .route("/api/v1/requests/{id}/accept", post(http::accept_request))
        .route("/api/v1/requests/{id}/decline", post(http::decline_request))
        .route("/api/v1/requests/{id}/cancel", post(http::cancel_request))
        .route("/api/v1/drivers/nearby", get(http::nearby_drivers))
        .route("/api/v1/drivers/{id}/location", post(http::driver_location))
        .route("/api/v1/drivers/{id}/online-status", put(http::driver_online_status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
