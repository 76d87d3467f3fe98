// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification dispatch (C6, §4.6): translates engine events into typed
//! push messages, resolves push credentials via the user store, and
//! tolerates delivery failure without rolling back engine state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::RideRequestSnapshot;
use crate::error::DispatchError;
use crate::ports::{PushTransport, UserStore};

/// Currency for a driver-initiated `payment_request` (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurrencyCode {
    #[serde(rename = "HBD")]
    Hbd,
    #[serde(rename = "HIVE")]
    Hive,
}

/// Trip details carried by a `ride_request` push — everything a driver's
/// client needs to render the offer. Derived from `RideRequestSnapshot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPayload {
    pub passenger_id: String,
    pub passenger_name: String,
    pub passenger_contact: String,
    pub pickup: crate::domain::Location,
    pub dropoff: crate::domain::Location,
    pub distance_km: f64,
    pub duration_min: f64,
    pub priority: crate::domain::Priority,
    pub proposed_fare: f64,
}

impl From<&RideRequestSnapshot> for TripPayload {
    fn from(snapshot: &RideRequestSnapshot) -> Self {
        Self {
            passenger_id: snapshot.passenger_id.clone(),
            passenger_name: snapshot.passenger_name.clone(),
            passenger_contact: snapshot.passenger_contact.clone(),
            pickup: snapshot.pickup.clone(),
            dropoff: snapshot.dropoff.clone(),
            distance_km: snapshot.estimated_distance_km,
            duration_min: snapshot.estimated_duration_min,
            priority: snapshot.priority,
            proposed_fare: snapshot.proposed_fare,
        }
    }
}

/// One typed push message, per the kinds enumerated in §4.6.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PushMessage {
    RideRequest {
        #[serde(rename = "requestId")]
        request_id: Uuid,
        trip: TripPayload,
    },
    RideRequestExpired {
        #[serde(rename = "requestId")]
        request_id: Uuid,
    },
    RideAccepted {
        #[serde(rename = "requestId")]
        request_id: Uuid,
        #[serde(rename = "driverId")]
        driver_id: String,
        #[serde(rename = "etaMinutes")]
        eta_minutes: u32,
    },
    NoDriversAvailable {
        #[serde(rename = "requestId")]
        request_id: Uuid,
    },
    DriverArrived {
        #[serde(rename = "requestId")]
        request_id: Uuid,
    },
    TripStarted {
        #[serde(rename = "requestId")]
        request_id: Uuid,
    },
    TripCompleted {
        #[serde(rename = "requestId")]
        request_id: Uuid,
        #[serde(rename = "finalFare")]
        final_fare: f64,
        #[serde(rename = "completedAt")]
        completed_at: DateTime<Utc>,
    },
    PaymentRequest {
        invoice: String,
        amount: f64,
        #[serde(rename = "currencyCode")]
        currency_code: CurrencyCode,
        #[serde(rename = "payeeAccount")]
        payee_account: String,
        #[serde(rename = "driverName")]
        driver_name: String,
    },
}

impl PushMessage {
    /// Stable tag for log fields, independent of serde's wire rename.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RideRequest { .. } => "ride_request",
            Self::RideRequestExpired { .. } => "ride_request_expired",
            Self::RideAccepted { .. } => "ride_accepted",
            Self::NoDriversAvailable { .. } => "no_drivers_available",
            Self::DriverArrived { .. } => "driver_arrived",
            Self::TripStarted { .. } => "trip_started",
            Self::TripCompleted { .. } => "trip_completed",
            Self::PaymentRequest { .. } => "payment_request",
        }
    }
}

/// Translates engine events into pushes and delivers them, tolerating a
/// missing credential (not a dispatch failure) while surfacing transport
/// errors to the caller (§4.6).
pub struct NotificationDispatcher {
    users: Arc<dyn UserStore>,
    transport: Arc<dyn PushTransport>,
}

impl NotificationDispatcher {
    pub fn new(users: Arc<dyn UserStore>, transport: Arc<dyn PushTransport>) -> Self {
        Self { users, transport }
    }

    pub async fn send(&self, user_id: &str, message: PushMessage) -> Result<(), DispatchError> {
        let Some(user) = self.users.get_user(user_id).await else {
            tracing::warn!(user_id, kind = message.kind(), "push target unknown to user store");
            return Ok(());
        };

        let Some(credential) = user.push_credential else {
            tracing::warn!(user_id, kind = message.kind(), "user has no push credential; skipping delivery");
            return Ok(());
        };

        match self.transport.send(&credential, &message).await {
            Ok(()) => {
                tracing::info!(user_id, kind = message.kind(), "push sent");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(user_id, kind = message.kind(), error = %err, "push delivery failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FailingPushTransport, InMemoryUserStore, RecordingPushTransport, UserRecord};

    async fn seeded_users() -> Arc<InMemoryUserStore> {
        let store = InMemoryUserStore::new();
        store
            .upsert(UserRecord {
                user_id: "d1".into(),
                display_name: "Driver One".into(),
                push_credential: Some("tok-d1".into()),
            })
            .await;
        store
            .upsert(UserRecord { user_id: "no-cred".into(), display_name: "No Credential".into(), push_credential: None })
            .await;
        Arc::new(store)
    }

    #[tokio::test]
    async fn delivers_to_known_credential() {
        let transport = Arc::new(RecordingPushTransport::new());
        let dispatcher = NotificationDispatcher::new(seeded_users().await, transport.clone());

        dispatcher.send("d1", PushMessage::NoDriversAvailable { request_id: Uuid::new_v4() }).await.unwrap();
        assert_eq!(transport.sent_to("tok-d1").await.len(), 1);
    }

    #[tokio::test]
    async fn missing_credential_is_not_an_error() {
        let transport = Arc::new(RecordingPushTransport::new());
        let dispatcher = NotificationDispatcher::new(seeded_users().await, transport.clone());

        let result = dispatcher.send("no-cred", PushMessage::NoDriversAvailable { request_id: Uuid::new_v4() }).await;
        assert!(result.is_ok());
        assert_eq!(transport.len().await, 0);
    }

    #[tokio::test]
    async fn unknown_user_is_not_an_error() {
        let transport = Arc::new(RecordingPushTransport::new());
        let dispatcher = NotificationDispatcher::new(seeded_users().await, transport.clone());

        let result = dispatcher.send("ghost", PushMessage::NoDriversAvailable { request_id: Uuid::new_v4() }).await;
        assert!(result.is_ok());
        assert_eq!(transport.len().await, 0);
    }

    #[tokio::test]
    async fn transport_failure_surfaces_as_error() {
        let dispatcher = NotificationDispatcher::new(seeded_users().await, Arc::new(FailingPushTransport));
        let result = dispatcher.send("d1", PushMessage::NoDriversAvailable { request_id: Uuid::new_v4() }).await;
        assert!(result.is_err());
    }
}
