// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-offer timers and the durable fallback sweeper (C5, §4.5).
//!
//! Each armed offer races `tokio::time::sleep` against a per-request
//! `CancellationToken`, following the teacher's poller/health-checker
//! `tokio::select!` shape. A background sweeper (grounded in the teacher's
//! `spawn_health_checker`) periodically scans the store for offeree TTLs
//! that lapsed without an in-process timer firing — covering a crashed
//! worker's orphaned offer — and synthesizes the same timeout event.
//!
//! Timeouts are delivered over a channel rather than by holding a reference
//! back to `DispatchEngine`, so `OfferTimer` and `DispatchEngine` have no
//! cyclic dependency on each other; the wiring in `lib.rs` is what connects
//! a timeout event to `DispatchEngine::timeout`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::store::RequestStore;

/// A fired or swept timeout, scoped to the exact offer it belongs to.
#[derive(Debug, Clone)]
pub struct TimeoutEvent {
    pub request_id: Uuid,
    pub driver_id: String,
}

pub struct OfferTimer {
    tokens: RwLock<HashMap<Uuid, CancellationToken>>,
    events_tx: mpsc::Sender<TimeoutEvent>,
}

impl OfferTimer {
    pub fn new(events_tx: mpsc::Sender<TimeoutEvent>) -> Arc<Self> {
        Arc::new(Self { tokens: RwLock::new(HashMap::new()), events_tx })
    }

    /// Arm a single-fire timer for `request_id`/`driver_id`. Replaces any
    /// timer already armed for this request (cancelling it first).
    pub async fn arm(self: &Arc<Self>, request_id: Uuid, driver_id: String, duration: Duration) {
        let token = CancellationToken::new();
        if let Some(prev) = self.tokens.write().await.insert(request_id, token.clone()) {
            prev.cancel();
        }

        let events_tx = self.events_tx.clone();
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(duration) => {
                    tracing::debug!(request_id = %request_id, driver_id = %driver_id, "offer timer fired");
                    let _ = events_tx.send(TimeoutEvent { request_id, driver_id }).await;
                }
            }

            let mut tokens = this.tokens.write().await;
            if let Some(current) = tokens.get(&request_id) {
                if current.is_cancelled() {
                    tokens.remove(&request_id);
                }
            }
        });
    }

    /// Cancel any outstanding timer for `request_id`.
    pub async fn disarm(&self, request_id: Uuid) {
        if let Some(token) = self.tokens.write().await.remove(&request_id) {
            token.cancel();
        }
    }

    #[cfg(test)]
    pub async fn is_armed(&self, request_id: Uuid) -> bool {
        self.tokens.read().await.contains_key(&request_id)
    }
}

/// Spawn the durable sweeper: periodically scans `store` for offers whose
/// offeree TTL lapsed (§4.2, §4.5) and synthesizes a `TimeoutEvent` for each,
/// covering crashed-worker orphans that no in-process timer will ever fire.
pub fn spawn_sweeper(
    store: Arc<RequestStore>,
    events_tx: mpsc::Sender<TimeoutEvent>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }

            let lapsed = store.lapsed_offers().await;
            for (request_id, driver_id) in lapsed {
                tracing::debug!(request_id = %request_id, driver_id = %driver_id, "sweeper found lapsed offer");
                let _ = events_tx.send(TimeoutEvent { request_id, driver_id }).await;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn armed_timer_fires_after_duration() {
        let (tx, mut rx) = mpsc::channel(8);
        let timer = OfferTimer::new(tx);
        let request_id = Uuid::new_v4();
        timer.arm(request_id, "d1".into(), Duration::from_millis(5)).await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.request_id, request_id);
        assert_eq!(event.driver_id, "d1");
    }

    #[tokio::test]
    async fn disarm_prevents_fire() {
        let (tx, mut rx) = mpsc::channel(8);
        let timer = OfferTimer::new(tx);
        let request_id = Uuid::new_v4();
        timer.arm(request_id, "d1".into(), Duration::from_millis(20)).await;
        timer.disarm(request_id).await;

        let result = tokio::time::timeout(Duration::from_millis(40), rx.recv()).await;
        assert!(result.is_err(), "expected no timeout event after disarm");
    }

    #[tokio::test]
    async fn rearming_cancels_prior_timer() {
        let (tx, mut rx) = mpsc::channel(8);
        let timer = OfferTimer::new(tx);
        let request_id = Uuid::new_v4();
        timer.arm(request_id, "d1".into(), Duration::from_millis(10)).await;
        timer.arm(request_id, "d2".into(), Duration::from_millis(10)).await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.driver_id, "d2");

        let result = tokio::time::timeout(Duration::from_millis(30), rx.recv()).await;
        assert!(result.is_err(), "first timer should have been cancelled, not fired");
    }
}
