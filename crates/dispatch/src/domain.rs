// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared domain types: the canonical ride request, the trip snapshot threaded
//! through dispatch, and the small enums the rest of the crate builds on.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A geographic point with a human-readable label, used for both pickup and dropoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

/// Dispatch priority. `High` affects nothing in the core matching algorithm today
/// (see Non-goals) but is threaded through so a future scorer has it available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Normal,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

/// Canonical, persisted status of a ride request. Owned by the ride store;
/// mutated by `AdmissionAPI` on accept and by trip-lifecycle events that are
/// themselves driven from outside the dispatch engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStatus {
    Pending,
    Accepted,
    ArrivedAtPickup,
    InTransit,
    Completed,
    Cancelled,
    NoDriversAvailable,
}

/// Status as projected to external callers by `StatusReader`. This is the
/// ephemeral-state alphabet: `offering` collapses into `pending` because no
/// caller needs to distinguish "still pending" from "an offer is currently
/// outstanding" — see `DispatchEngine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Pending,
    Accepted,
    NoDriversAvailable,
    Cancelled,
}

impl DispatchStatus {
    /// Once true, invariant 3 (terminal monotonicity) forbids returning to `Pending`.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A driver's verdict on an outstanding offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accept,
    Decline,
}

/// How a driver (or the timer) resolved one offer, for the append-only response log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Accept,
    Decline,
    Timeout,
}

/// One entry in a request's response log (§4.2, invariant 2).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseLogEntry {
    pub driver_id: String,
    pub response: ResponseKind,
    pub at: DateTime<Utc>,
}

/// The canonical ride request row. Owned and persisted by the ride store;
/// the dispatch engine only ever reads a `RideRequestSnapshot` derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideRequest {
    pub id: Uuid,
    pub passenger_id: String,
    pub passenger_name: String,
    pub passenger_contact: String,
    pub pickup: Location,
    pub dropoff: Location,
    pub estimated_distance_km: f64,
    pub estimated_duration_min: f64,
    pub proposed_fare: f64,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub status: CanonicalStatus,
    pub assigned_driver_id: Option<String>,
}

/// Everything an offer needs to describe the trip to a candidate driver,
/// captured once at admission and threaded unchanged through every `advance`
/// call so cascaded offers (after a decline or timeout) carry full details
/// instead of the empty payload the source implementation produced.
///
/// Wrapped in `Arc` by callers so re-offering is a cheap clone, not a refetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideRequestSnapshot {
    pub request_id: Uuid,
    pub passenger_id: String,
    pub passenger_name: String,
    pub passenger_contact: String,
    pub pickup: Location,
    pub dropoff: Location,
    pub estimated_distance_km: f64,
    pub estimated_duration_min: f64,
    pub proposed_fare: f64,
    pub priority: Priority,
}

impl RideRequestSnapshot {
    pub fn from_request(req: &RideRequest) -> Arc<Self> {
        Arc::new(Self {
            request_id: req.id,
            passenger_id: req.passenger_id.clone(),
            passenger_name: req.passenger_name.clone(),
            passenger_contact: req.passenger_contact.clone(),
            pickup: req.pickup.clone(),
            dropoff: req.dropoff.clone(),
            estimated_distance_km: req.estimated_distance_km,
            estimated_duration_min: req.estimated_duration_min,
            proposed_fare: req.proposed_fare,
            priority: req.priority,
        })
    }
}

/// A subsequent canonical trip-lifecycle transition, driven by whatever
/// external system owns the ride after acceptance (meter app, driver client).
/// Out of scope for matching, but the notifications these transitions cause
/// (`driver_arrived`, `trip_started`, `trip_completed`) are part of the
/// ambient notification surface (§4.6) so they are modeled here rather than
/// silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TripEvent {
    ArrivedAtPickup,
    Started,
    Completed {
        #[serde(rename = "finalFare")]
        final_fare: f64,
    },
}
