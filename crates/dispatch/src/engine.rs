// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dispatch state machine (C4, §4.4): advances a request through
//! candidates one offer at a time, enforces the single-offer invariant via
//! the store's compare-and-set, and resolves to a terminal state.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::domain::{DispatchStatus, ResponseKind, RideRequestSnapshot, Verdict};
use crate::error::DispatchError;
use crate::notify::{NotificationDispatcher, PushMessage, TripPayload};
use crate::queue::CandidateQueue;
use crate::store::RequestStore;
use crate::timer::OfferTimer;

pub struct EngineTimeouts {
    pub offer: Duration,
    pub accepted_ttl: Duration,
    pub offeree_ttl: Duration,
}

pub struct DispatchEngine {
    store: Arc<RequestStore>,
    queue: Arc<CandidateQueue>,
    timer: Arc<OfferTimer>,
    notifier: Arc<NotificationDispatcher>,
    timeouts: EngineTimeouts,
}

impl DispatchEngine {
    pub fn new(
        store: Arc<RequestStore>,
        queue: Arc<CandidateQueue>,
        timer: Arc<OfferTimer>,
        notifier: Arc<NotificationDispatcher>,
        timeouts: EngineTimeouts,
    ) -> Self {
        Self { store, queue, timer, notifier, timeouts }
    }

    /// `pending --admit--> offering|exhausted`. `candidates` is the ordered
    /// list (ascending distance) already filtered for liveness by the caller
    /// (invariant 5). The snapshot is threaded through every subsequent
    /// `advance` so cascaded offers always carry full trip details.
    pub async fn admit(
        &self,
        snapshot: Arc<RideRequestSnapshot>,
        candidates: Vec<String>,
    ) -> Result<(), DispatchError> {
        let request_id = snapshot.request_id;
        if candidates.is_empty() {
            return self.exhaust(&snapshot).await;
        }

        self.queue.seed(request_id, candidates).await;
        self.advance(&snapshot).await
    }

    /// Pop the next candidate and offer it, or resolve to exhausted if the
    /// queue is empty. Internal to the engine; called by `admit`, by
    /// `response` on decline, and by `timeout`.
    async fn advance(&self, snapshot: &Arc<RideRequestSnapshot>) -> Result<(), DispatchError> {
        let request_id = snapshot.request_id;

        let Some(driver_id) = self.queue.pop_next(request_id).await else {
            return self.exhaust(snapshot).await;
        };

        let won = self
            .store
            .set_current_offeree(request_id, &driver_id, None, self.timeouts.offeree_ttl)
            .await?;

        if !won {
            // Another worker is already advancing this request; drop the
            // candidate we popped rather than push it back (§4.4, documented
            // choice — costs one skipped candidate per race).
            tracing::warn!(request_id = %request_id, driver_id, "lost CAS race advancing offer; dropping candidate");
            return Ok(());
        }

        tracing::info!(request_id = %request_id, driver_id, "offering ride to candidate");

        let trip = TripPayload::from(snapshot.as_ref());
        if let Err(err) = self
            .notifier
            .send(&driver_id, PushMessage::RideRequest { request_id, trip })
            .await
        {
            // Delivery failure does not alter state: the timer still arms
            // and, absent a response, will eventually advance past this driver.
            tracing::warn!(request_id = %request_id, driver_id, error = %err, "ride_request push failed");
        }

        self.timer.arm(request_id, driver_id, self.timeouts.offer).await;
        Ok(())
    }

    async fn exhaust(&self, snapshot: &Arc<RideRequestSnapshot>) -> Result<(), DispatchError> {
        let request_id = snapshot.request_id;
        self.store.set_status(request_id, DispatchStatus::NoDriversAvailable, self.timeouts.accepted_ttl).await;
        self.store.delete_dispatch_ephemera(request_id).await;
        self.queue.drop_queue(request_id).await;
        self.timer.disarm(request_id).await;

        tracing::info!(request_id = %request_id, "candidate queue exhausted");
        if let Err(err) = self
            .notifier
            .send(&snapshot.passenger_id, PushMessage::NoDriversAvailable { request_id })
            .await
        {
            tracing::warn!(request_id = %request_id, error = %err, "no_drivers_available push failed");
        }
        Ok(())
    }

    /// `offering --response--> accepted|offering`. Returns `true` if the
    /// verdict was applied, `false` if the driver was not the current
    /// offeree or the request had already resolved (invariant 4).
    pub async fn response(
        &self,
        request_id: Uuid,
        driver_id: &str,
        verdict: Verdict,
        eta_minutes: Option<u32>,
    ) -> Result<bool, DispatchError> {
        if verdict == Verdict::Accept && eta_minutes.is_none() {
            return Err(DispatchError::Validation("etaMinutes is required on accept".to_owned()));
        }

        if self.store.get_status(request_id).await.is_terminal() {
            return Ok(false);
        }

        // Claim the offeree slot before any other write. The compare
        // ("is `driver_id` still the live offeree?") and the clear share one
        // lock acquisition, so of two racing responses for the same driver
        // only one can win this call (invariant 4).
        if !self.store.clear_current_offeree_if(request_id, driver_id).await {
            return Ok(false);
        }

        let Some(snapshot) = self.store.get_snapshot(request_id).await else {
            return Err(DispatchError::StoreUnavailable(format!("no dispatch snapshot for {request_id}")));
        };

        match verdict {
            Verdict::Accept => {
                // Guaranteed `Some` by the guard above.
                let eta_minutes = eta_minutes.unwrap_or_default();

                self.store.append_response(request_id, driver_id, ResponseKind::Accept).await;
                self.store.set_assigned_driver(request_id, driver_id, self.timeouts.accepted_ttl).await;
                self.store.set_eta(request_id, eta_minutes).await;
                self.store.set_status(request_id, DispatchStatus::Accepted, self.timeouts.accepted_ttl).await;
                self.queue.drop_queue(request_id).await;
                self.timer.disarm(request_id).await;

                tracing::info!(request_id = %request_id, driver_id, "request accepted");
                if let Err(err) = self
                    .notifier
                    .send(
                        &snapshot.passenger_id,
                        PushMessage::RideAccepted { request_id, driver_id: driver_id.to_owned(), eta_minutes },
                    )
                    .await
                {
                    tracing::warn!(request_id = %request_id, error = %err, "ride_accepted push failed");
                }

                Ok(true)
            }
            Verdict::Decline => {
                self.store.append_response(request_id, driver_id, ResponseKind::Decline).await;
                self.timer.disarm(request_id).await;

                tracing::info!(request_id = %request_id, driver_id, "driver declined offer");
                self.advance(&snapshot).await?;
                Ok(true)
            }
        }
    }

    /// `offering --timeout--> offering|exhausted`, a no-op if the offeree has
    /// since changed (guard in §4.4) — the common case when the engine
    /// already advanced past this offer before the timer fired.
    pub async fn timeout(&self, request_id: Uuid, driver_id: &str) -> Result<(), DispatchError> {
        if self.store.get_status(request_id).await.is_terminal() {
            return Ok(());
        }

        if !self.store.clear_current_offeree_if(request_id, driver_id).await {
            return Ok(());
        }

        let Some(snapshot) = self.store.get_snapshot(request_id).await else {
            return Ok(());
        };

        self.store.append_response(request_id, driver_id, ResponseKind::Timeout).await;

        tracing::info!(request_id = %request_id, driver_id, "offer timed out");
        if let Err(err) = self
            .notifier
            .send(driver_id, PushMessage::RideRequestExpired { request_id })
            .await
        {
            tracing::warn!(request_id = %request_id, driver_id, error = %err, "ride_request_expired push failed");
        }

        self.advance(&snapshot).await
    }

    /// Passenger-initiated cancel. Behavior beyond the state transition is
    /// deferred (Non-goals); this only absorbs the event via the terminal
    /// guard and tears down ephemera.
    pub async fn cancel(&self, request_id: Uuid) -> Result<bool, DispatchError> {
        if self.store.get_status(request_id).await.is_terminal() {
            return Ok(false);
        }

        self.timer.disarm(request_id).await;
        self.queue.drop_queue(request_id).await;
        self.store.delete_dispatch_ephemera(request_id).await;
        self.store.set_status(request_id, DispatchStatus::Cancelled, self.timeouts.accepted_ttl).await;

        tracing::info!(request_id = %request_id, "request cancelled");
        Ok(true)
    }
}
