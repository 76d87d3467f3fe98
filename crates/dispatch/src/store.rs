// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ephemeral dispatch store (C2, §4.2): per-request status, current
//! offeree, accepted driver, ETA, and response log, all with TTL semantics.
//!
//! Modeled as a single in-process `RwLock<HashMap>` (the logical shape of the
//! key-value layout in §6 — one row per request id holding the fields that
//! table spreads across several keys), mirroring the teacher's `MuxState`
//! convention of one shared map behind a lock rather than a set of actors.
//! The one non-negotiable primitive is `set_current_offeree`'s compare-and-set:
//! it is what prevents two workers from racing two drivers onto one request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{DispatchStatus, ResponseKind, ResponseLogEntry, RideRequestSnapshot};
use crate::error::DispatchError;

struct TtlValue<T> {
    value: T,
    expires_at: Instant,
}

impl<T> TtlValue<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self { value, expires_at: Instant::now() + ttl }
    }

    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

struct RequestRecord {
    status: TtlValue<DispatchStatus>,
    current_offeree: Option<TtlValue<String>>,
    assigned_driver: Option<TtlValue<String>>,
    eta_minutes: Option<u32>,
    response_log: TtlValue<Vec<ResponseLogEntry>>,
    snapshot: Arc<RideRequestSnapshot>,
}

pub struct RequestStore {
    records: RwLock<HashMap<Uuid, RequestRecord>>,
}

impl RequestStore {
    pub fn new() -> Self {
        Self { records: RwLock::new(HashMap::new()) }
    }

    /// Atomically set ephemeral status to `pending`, capturing the trip
    /// snapshot that every subsequent offer will carry.
    pub async fn init_dispatch(&self, request_id: Uuid, snapshot: Arc<RideRequestSnapshot>, ttl: Duration) {
        let mut records = self.records.write().await;
        records.insert(
            request_id,
            RequestRecord {
                status: TtlValue::new(DispatchStatus::Pending, ttl),
                current_offeree: None,
                assigned_driver: None,
                eta_minutes: None,
                response_log: TtlValue::new(Vec::new(), Duration::from_secs(86_400)),
                snapshot,
            },
        );
    }

    pub async fn set_status(&self, request_id: Uuid, status: DispatchStatus, ttl: Duration) {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(&request_id) {
            record.status = TtlValue::new(status, ttl);
        }
    }

    /// Returns `Pending` if the record is absent or has expired, per contract.
    pub async fn get_status(&self, request_id: Uuid) -> DispatchStatus {
        let records = self.records.read().await;
        records
            .get(&request_id)
            .filter(|r| r.status.is_live())
            .map(|r| r.status.value)
            .unwrap_or(DispatchStatus::Pending)
    }

    /// Compare-and-set the current offeree. Succeeds only if the live value
    /// equals `expected_prev` (use `None` to mean "currently empty").
    /// This is the sole synchronization primitive for invariant 1.
    pub async fn set_current_offeree(
        &self,
        request_id: Uuid,
        driver_id: &str,
        expected_prev: Option<&str>,
        ttl: Duration,
    ) -> Result<bool, DispatchError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&request_id)
            .ok_or_else(|| DispatchError::StoreUnavailable("no dispatch record".to_owned()))?;

        let current = record.current_offeree.as_ref().filter(|v| v.is_live()).map(|v| v.value.as_str());
        if current != expected_prev {
            return Ok(false);
        }

        record.current_offeree = Some(TtlValue::new(driver_id.to_owned(), ttl));
        Ok(true)
    }

    pub async fn get_current_offeree(&self, request_id: Uuid) -> Option<String> {
        let records = self.records.read().await;
        records.get(&request_id).and_then(|r| r.current_offeree.as_ref()).filter(|v| v.is_live()).map(|v| v.value.clone())
    }

    pub async fn clear_current_offeree(&self, request_id: Uuid) {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(&request_id) {
            record.current_offeree = None;
        }
    }

    /// Claim the offeree slot by clearing it, but only if the live value is
    /// still `expected_driver_id`. The compare and the clear share one write
    /// lock acquisition, so this is what a driver's accept/decline response
    /// uses to settle invariant 1 against a racing duplicate response for
    /// the same driver: whichever caller's compare wins gets the clear, the
    /// other observes the slot already gone and reports `false`.
    pub async fn clear_current_offeree_if(&self, request_id: Uuid, expected_driver_id: &str) -> bool {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(&request_id) else {
            return false;
        };

        let current = record.current_offeree.as_ref().filter(|v| v.is_live()).map(|v| v.value.as_str());
        if current != Some(expected_driver_id) {
            return false;
        }

        record.current_offeree = None;
        true
    }

    pub async fn set_assigned_driver(&self, request_id: Uuid, driver_id: &str, ttl: Duration) {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(&request_id) {
            record.assigned_driver = Some(TtlValue::new(driver_id.to_owned(), ttl));
        }
    }

    pub async fn get_assigned_driver(&self, request_id: Uuid) -> Option<String> {
        let records = self.records.read().await;
        records.get(&request_id).and_then(|r| r.assigned_driver.as_ref()).filter(|v| v.is_live()).map(|v| v.value.clone())
    }

    pub async fn set_eta(&self, request_id: Uuid, minutes: u32) {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(&request_id) {
            record.eta_minutes = Some(minutes);
        }
    }

    pub async fn get_eta(&self, request_id: Uuid) -> Option<u32> {
        self.records.read().await.get(&request_id).and_then(|r| r.eta_minutes)
    }

    pub async fn append_response(&self, request_id: Uuid, driver_id: &str, response: ResponseKind) {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(&request_id) {
            record.response_log.value.push(ResponseLogEntry {
                driver_id: driver_id.to_owned(),
                response,
                at: Utc::now(),
            });
        }
    }

    pub async fn get_response_log(&self, request_id: Uuid) -> Vec<ResponseLogEntry> {
        self.records.read().await.get(&request_id).map(|r| r.response_log.value.clone()).unwrap_or_default()
    }

    pub async fn get_snapshot(&self, request_id: Uuid) -> Option<Arc<RideRequestSnapshot>> {
        self.records.read().await.get(&request_id).map(|r| Arc::clone(&r.snapshot))
    }

    /// Remove the offeree key, leaving status/log/assigned-driver untouched
    /// (those are still read by `StatusReader` after resolution). The
    /// candidate queue itself is a separate component (`CandidateQueue`);
    /// callers drop it alongside this.
    pub async fn delete_dispatch_ephemera(&self, request_id: Uuid) {
        self.clear_current_offeree(request_id).await;
    }

    /// Requests whose current-offeree TTL has lapsed while status is still
    /// `Pending` — the durable sweeper's (§4.5) scan target. Returns
    /// `(request_id, driver_id)` pairs.
    pub async fn lapsed_offers(&self) -> Vec<(Uuid, String)> {
        let records = self.records.read().await;
        records
            .iter()
            .filter(|(_, r)| r.status.is_live() && r.status.value == DispatchStatus::Pending)
            .filter_map(|(id, r)| {
                r.current_offeree.as_ref().filter(|v| !v.is_live()).map(|v| (*id, v.value.clone()))
            })
            .collect()
    }
}

impl Default for RequestStore {
    fn default() -> Self {
        Self::new()
    }
}
