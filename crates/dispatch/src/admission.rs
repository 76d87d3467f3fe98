// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entry point invoked by request-creation and driver-response handlers
//! (C8, §4.8). Wraps `DispatchEngine` operations and keeps the canonical
//! ride store in sync on terminal transitions.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::domain::{CanonicalStatus, Location, Priority, RideRequest, RideRequestSnapshot, TripEvent, Verdict};
use crate::engine::DispatchEngine;
use crate::error::DispatchError;
use crate::notify::{NotificationDispatcher, PushMessage};
use crate::ports::{new_ride_request, RideStore};
use crate::presence::PresenceIndex;
use crate::store::RequestStore;

/// Input for `create-request` (§6 callable surface).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRideRequest {
    pub passenger_id: String,
    pub passenger_name: String,
    pub passenger_contact: String,
    pub pickup: Location,
    pub dropoff: Location,
    pub estimated_distance_km: f64,
    pub estimated_duration_min: f64,
    pub proposed_fare: f64,
    #[serde(default)]
    pub priority: Priority,
}

/// `{applied, reason}` returned by `decline-request` (§6).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondOutcome {
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

pub struct AdmissionApi {
    ride_store: Arc<dyn RideStore>,
    request_store: Arc<RequestStore>,
    presence: Arc<PresenceIndex>,
    engine: Arc<DispatchEngine>,
    notifier: Arc<NotificationDispatcher>,
    config: DispatchConfig,
}

impl AdmissionApi {
    pub fn new(
        ride_store: Arc<dyn RideStore>,
        request_store: Arc<RequestStore>,
        presence: Arc<PresenceIndex>,
        engine: Arc<DispatchEngine>,
        notifier: Arc<NotificationDispatcher>,
        config: DispatchConfig,
    ) -> Self {
        Self { ride_store, request_store, presence, engine, notifier, config }
    }

    /// Persists the canonical request, initializes ephemeral dispatch state,
    /// and kicks off candidate search + `admit` on a background task so the
    /// caller observes `pending` immediately (§5 Backpressure).
    pub async fn create_and_dispatch(&self, input: CreateRideRequest) -> Result<RideRequest, DispatchError> {
        let request = new_ride_request(
            input.passenger_id,
            input.passenger_name,
            input.passenger_contact,
            input.pickup,
            input.dropoff,
            input.estimated_distance_km,
            input.estimated_duration_min,
            input.proposed_fare,
            input.priority,
        );
        let request = self.ride_store.insert(request).await?;

        let snapshot = RideRequestSnapshot::from_request(&request);
        self.request_store.init_dispatch(request.id, snapshot.clone(), self.config.queue_ttl()).await;

        tracing::info!(request_id = %request.id, passenger_id = %snapshot.passenger_id, "ride request admitted");

        let presence = Arc::clone(&self.presence);
        let engine = Arc::clone(&self.engine);
        let radius_km = self.config.search_radius_km;
        let limit = self.config.search_limit;
        let liveness_ttl = self.config.liveness_ttl();
        let dispatch_snapshot = Arc::clone(&snapshot);

        tokio::spawn(async move {
            let candidates = presence
                .nearest(dispatch_snapshot.pickup.lat, dispatch_snapshot.pickup.lng, radius_km, limit, liveness_ttl)
                .await
                .into_iter()
                .map(|c| c.driver_id)
                .collect::<Vec<_>>();

            if let Err(err) = engine.admit(dispatch_snapshot.clone(), candidates).await {
                tracing::warn!(request_id = %dispatch_snapshot.request_id, error = %err, "admit failed");
            }
        });

        Ok(request)
    }

    /// `accept-request` / `decline-request` (§6). Returns `applied = false`
    /// (never an error) when the driver was not the current offeree or the
    /// request had already resolved.
    pub async fn respond(
        &self,
        request_id: Uuid,
        driver_id: &str,
        verdict: Verdict,
        eta_minutes: Option<u32>,
    ) -> Result<RespondOutcome, DispatchError> {
        let applied = self.engine.response(request_id, driver_id, verdict, eta_minutes).await?;
        if !applied {
            return Ok(RespondOutcome { applied: false, reason: Some("not_current_offeree_or_resolved") });
        }

        if verdict == Verdict::Accept {
            self.ride_store.assign_driver(request_id, driver_id).await?;
            self.ride_store.set_status(request_id, CanonicalStatus::Accepted).await?;
        }

        Ok(RespondOutcome { applied: true, reason: None })
    }

    /// `cancel-request`, per the deferred passenger-cancellation hook (Non-goals).
    pub async fn cancel(&self, request_id: Uuid) -> Result<bool, DispatchError> {
        let applied = self.engine.cancel(request_id).await?;
        if applied {
            self.ride_store.set_status(request_id, CanonicalStatus::Cancelled).await?;
        }
        Ok(applied)
    }

    /// Records a canonical trip-lifecycle transition driven by whatever
    /// external system owns the ride post-acceptance, and fans out the
    /// corresponding passenger notification (§4.6).
    pub async fn record_trip_event(&self, request_id: Uuid, event: TripEvent) -> Result<(), DispatchError> {
        let request = self
            .ride_store
            .get(request_id)
            .await
            .ok_or_else(|| DispatchError::Validation(format!("no ride request {request_id}")))?;

        let (status, message) = match event {
            TripEvent::ArrivedAtPickup => {
                (CanonicalStatus::ArrivedAtPickup, PushMessage::DriverArrived { request_id })
            }
            TripEvent::Started => (CanonicalStatus::InTransit, PushMessage::TripStarted { request_id }),
            TripEvent::Completed { final_fare } => (
                CanonicalStatus::Completed,
                PushMessage::TripCompleted { request_id, final_fare, completed_at: chrono::Utc::now() },
            ),
        };

        self.ride_store.set_status(request_id, status).await?;
        if let Err(err) = self.notifier.send(&request.passenger_id, message).await {
            tracing::warn!(request_id = %request_id, error = %err, "trip-event push failed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineTimeouts;
    use crate::ports::{InMemoryRideStore, InMemoryUserStore, RecordingPushTransport, UserRecord};
    use crate::queue::CandidateQueue;
    use crate::timer::OfferTimer;
    use std::time::Duration;

    async fn test_api() -> (AdmissionApi, Arc<PresenceIndex>, Arc<RecordingPushTransport>) {
        let ride_store: Arc<dyn RideStore> = Arc::new(InMemoryRideStore::new());
        let request_store = Arc::new(RequestStore::new());
        let presence = Arc::new(PresenceIndex::new());
        let queue = Arc::new(CandidateQueue::new());
        let (tx, _rx) = tokio::sync::mpsc::channel(64);
        let timer = OfferTimer::new(tx);

        let users = InMemoryUserStore::new();
        for id in ["p1", "d1"] {
            users
                .upsert(UserRecord { user_id: id.into(), display_name: id.into(), push_credential: Some(format!("tok-{id}")) })
                .await;
        }
        let transport = Arc::new(RecordingPushTransport::new());
        let notifier = Arc::new(NotificationDispatcher::new(Arc::new(users), transport.clone()));

        let timeouts = EngineTimeouts {
            offer: Duration::from_secs(60),
            accepted_ttl: Duration::from_secs(3600),
            offeree_ttl: Duration::from_secs(120),
        };
        let engine = Arc::new(DispatchEngine::new(request_store.clone(), queue, timer, notifier.clone(), timeouts));

        let config = DispatchConfig::default();
        let api = AdmissionApi::new(ride_store, request_store, presence.clone(), engine, notifier, config);
        (api, presence, transport)
    }

    fn sample_input() -> CreateRideRequest {
        CreateRideRequest {
            passenger_id: "p1".into(),
            passenger_name: "Alice".into(),
            passenger_contact: "+1-555-0100".into(),
            pickup: Location { lat: 40.7128, lng: -74.0060, address: "pickup".into() },
            dropoff: Location { lat: 40.8, lng: -74.1, address: "dropoff".into() },
            estimated_distance_km: 5.0,
            estimated_duration_min: 12.0,
            proposed_fare: 15.0,
            priority: Priority::Normal,
        }
    }

    #[tokio::test]
    async fn create_and_dispatch_offers_nearby_driver() {
        let (api, presence, transport) = test_api().await;
        presence.heartbeat("d1", 40.7129, -74.0061).await;

        let request = api.create_and_dispatch(sample_input()).await.unwrap();
        assert_eq!(request.status, CanonicalStatus::Pending);

        // allow the spawned dispatch task to run
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(transport.sent_to("tok-d1").await.len(), 1);
    }

    #[tokio::test]
    async fn create_and_dispatch_with_no_drivers_exhausts() {
        let (api, _presence, transport) = test_api().await;
        let request = api.create_and_dispatch(sample_input()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(transport.sent_to("tok-p1").await.len(), 1);
        let _ = request;
    }

    #[tokio::test]
    async fn respond_accept_updates_canonical_store() {
        let (api, presence, _transport) = test_api().await;
        presence.heartbeat("d1", 40.7129, -74.0061).await;
        let request = api.create_and_dispatch(sample_input()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let outcome = api.respond(request.id, "d1", Verdict::Accept, Some(5)).await.unwrap();
        assert!(outcome.applied);

        let stored = api.ride_store.get(request.id).await.unwrap();
        assert_eq!(stored.status, CanonicalStatus::Accepted);
        assert_eq!(stored.assigned_driver_id.as_deref(), Some("d1"));
    }

    #[tokio::test]
    async fn cancel_before_resolution_sets_canonical_cancelled() {
        let (api, _presence, _transport) = test_api().await;
        let request = api.create_and_dispatch(sample_input()).await.unwrap();

        let applied = api.cancel(request.id).await.unwrap();
        assert!(applied);
        let stored = api.ride_store.get(request.id).await.unwrap();
        assert_eq!(stored.status, CanonicalStatus::Cancelled);
    }
}
