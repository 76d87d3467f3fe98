// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trait boundaries to the out-of-scope collaborators (C9, §4.9): the
//! relational store for canonical ride/user rows and the push transport.
//! Each gets one in-memory, concurrency-safe implementation plus test
//! doubles, following the corpus's `Arc<dyn SignerTrait>`-shaped ports for
//! talking to the outside world.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{CanonicalStatus, RideRequest};
use crate::error::DispatchError;
use crate::notify::PushMessage;

/// Read-only view of a driver or passenger held by the user store.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user_id: String,
    pub display_name: String,
    pub push_credential: Option<String>,
}

/// Lookup surface for driver/passenger identity and push credentials.
/// Out of scope per §1 (community/role management lives elsewhere); this
/// crate only needs the subset `NotificationDispatcher` reads.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Option<UserRecord>;
}

/// Persistence for the canonical ride request row (§3 Entities, RideRequest).
/// Out of scope per §1; the engine only ever reads a `RideRequestSnapshot`
/// derived from what this store holds.
#[async_trait]
pub trait RideStore: Send + Sync {
    async fn insert(&self, request: RideRequest) -> Result<RideRequest, DispatchError>;
    async fn get(&self, request_id: Uuid) -> Option<RideRequest>;
    async fn set_status(&self, request_id: Uuid, status: CanonicalStatus) -> Result<(), DispatchError>;
    async fn assign_driver(&self, request_id: Uuid, driver_id: &str) -> Result<(), DispatchError>;
}

/// Outbound push delivery. Out of scope per §1; `NotificationDispatcher`
/// is the only caller.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(&self, credential: &str, message: &PushMessage) -> Result<(), DispatchError>;
}

/// Concurrency-safe in-memory `UserStore`, sufficient for the demo binary
/// and integration tests.
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self { users: RwLock::new(HashMap::new()) }
    }

    pub async fn upsert(&self, user: UserRecord) {
        self.users.write().await.insert(user.user_id.clone(), user);
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_user(&self, user_id: &str) -> Option<UserRecord> {
        self.users.read().await.get(user_id).cloned()
    }
}

/// Concurrency-safe in-memory `RideStore`.
pub struct InMemoryRideStore {
    requests: RwLock<HashMap<Uuid, RideRequest>>,
}

impl InMemoryRideStore {
    pub fn new() -> Self {
        Self { requests: RwLock::new(HashMap::new()) }
    }
}

impl Default for InMemoryRideStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RideStore for InMemoryRideStore {
    async fn insert(&self, request: RideRequest) -> Result<RideRequest, DispatchError> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn get(&self, request_id: Uuid) -> Option<RideRequest> {
        self.requests.read().await.get(&request_id).cloned()
    }

    async fn set_status(&self, request_id: Uuid, status: CanonicalStatus) -> Result<(), DispatchError> {
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(&request_id)
            .ok_or_else(|| DispatchError::StoreUnavailable(format!("no ride request {request_id}")))?;
        request.status = status;
        Ok(())
    }

    async fn assign_driver(&self, request_id: Uuid, driver_id: &str) -> Result<(), DispatchError> {
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(&request_id)
            .ok_or_else(|| DispatchError::StoreUnavailable(format!("no ride request {request_id}")))?;
        request.assigned_driver_id = Some(driver_id.to_owned());
        Ok(())
    }
}

/// Production-shaped push transport that logs every delivery instead of
/// calling out to a real provider. Never fails — standing in for whatever
/// SMS/APNs/FCM gateway a deployment wires in.
pub struct LoggingPushTransport;

#[async_trait]
impl PushTransport for LoggingPushTransport {
    async fn send(&self, credential: &str, message: &PushMessage) -> Result<(), DispatchError> {
        tracing::info!(credential, kind = message.kind(), "push delivered");
        Ok(())
    }
}

/// Test double that records every message it was asked to send, for
/// assertions in unit and scenario tests.
#[derive(Default)]
pub struct RecordingPushTransport {
    pub sent: RwLock<Vec<(String, PushMessage)>>,
}

impl RecordingPushTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent_to(&self, credential: &str) -> Vec<PushMessage> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|(c, _)| c == credential)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.sent.read().await.len()
    }
}

#[async_trait]
impl PushTransport for RecordingPushTransport {
    async fn send(&self, credential: &str, message: &PushMessage) -> Result<(), DispatchError> {
        self.sent.write().await.push((credential.to_owned(), message.clone()));
        Ok(())
    }
}

/// Test double that always fails delivery, for exercising the "delivery
/// error does not alter engine state" failure semantics (§4.4, §7).
pub struct FailingPushTransport;

#[async_trait]
impl PushTransport for FailingPushTransport {
    async fn send(&self, _credential: &str, _message: &PushMessage) -> Result<(), DispatchError> {
        Err(DispatchError::Delivery("test transport configured to fail".to_owned()))
    }
}

pub fn new_ride_request(
    passenger_id: String,
    passenger_name: String,
    passenger_contact: String,
    pickup: crate::domain::Location,
    dropoff: crate::domain::Location,
    estimated_distance_km: f64,
    estimated_duration_min: f64,
    proposed_fare: f64,
    priority: crate::domain::Priority,
) -> RideRequest {
    RideRequest {
        id: Uuid::new_v4(),
        passenger_id,
        passenger_name,
        passenger_contact,
        pickup,
        dropoff,
        estimated_distance_km,
        estimated_duration_min,
        proposed_fare,
        priority,
        created_at: Utc::now(),
        status: CanonicalStatus::Pending,
        assigned_driver_id: None,
    }
}
