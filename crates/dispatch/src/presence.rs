// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The driver presence index (C1, §4.1): a geographic + liveness index drivers
//! heartbeat into and `AdmissionAPI` queries for dispatch candidates.
//!
//! Kept as a plain `RwLock<HashMap>` rather than a geo-tree, following the
//! teacher's own session map (`MuxState::sessions`) — at the scale this
//! engine is specified for, a linear scan per query is not the bottleneck,
//! and it keeps the liveness sweep (invariant 5) trivial to reason about.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::geo::haversine_km;

#[derive(Debug, Clone, Copy)]
struct PresenceEntry {
    lat: f64,
    lng: f64,
    last_seen: Instant,
}

/// A candidate returned by `nearest`: driver id and distance in kilometers.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub driver_id: String,
    pub distance_km: f64,
}

pub struct PresenceIndex {
    entries: RwLock<HashMap<String, PresenceEntry>>,
}

impl PresenceIndex {
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }

    /// Upsert a driver's position and last-seen time.
    pub async fn heartbeat(&self, driver_id: &str, lat: f64, lng: f64) {
        let mut entries = self.entries.write().await;
        entries.insert(driver_id.to_owned(), PresenceEntry { lat, lng, last_seen: Instant::now() });
    }

    /// Remove a driver from the index (e.g. they went offline).
    pub async fn mark_offline(&self, driver_id: &str) {
        self.entries.write().await.remove(driver_id);
    }

    /// The `k` nearest drivers within `radius_km` of `(lat, lng)`, ascending by
    /// distance, ties broken by driver id. Entries whose heartbeat is older
    /// than `liveness_ttl` are pruned from the index as a side effect
    /// (invariant 5), not merely excluded from the result.
    pub async fn nearest(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
        k: usize,
        liveness_ttl: Duration,
    ) -> Vec<Candidate> {
        let now = Instant::now();
        let mut stale = Vec::new();
        let mut candidates: Vec<Candidate> = {
            let entries = self.entries.read().await;
            entries
                .iter()
                .filter_map(|(driver_id, entry)| {
                    if now.duration_since(entry.last_seen) > liveness_ttl {
                        stale.push(driver_id.clone());
                        return None;
                    }
                    let distance_km = haversine_km(lat, lng, entry.lat, entry.lng);
                    (distance_km <= radius_km)
                        .then(|| Candidate { driver_id: driver_id.clone(), distance_km })
                })
                .collect()
        };

        if !stale.is_empty() {
            let mut entries = self.entries.write().await;
            for driver_id in stale {
                entries.remove(&driver_id);
            }
        }

        candidates.sort_by(|a, b| {
            a.distance_km
                .partial_cmp(&b.distance_km)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.driver_id.cmp(&b.driver_id))
        });
        candidates.truncate(k);
        candidates
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for PresenceIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn nearest_orders_by_distance() {
        let index = PresenceIndex::new();
        index.heartbeat("d1", 40.7138, -74.0070).await; // ~0.13km
        index.heartbeat("d2", 40.8000, -74.2000).await; // far
        index.heartbeat("d3", 40.7130, -74.0062).await; // closest

        let result = index.nearest(40.7128, -74.0060, 5.0, 10, Duration::from_secs(300)).await;
        let ids: Vec<&str> = result.iter().map(|c| c.driver_id.as_str()).collect();
        assert_eq!(ids, vec!["d3", "d1"]);
    }

    #[tokio::test]
    async fn ties_break_by_driver_id() {
        let index = PresenceIndex::new();
        index.heartbeat("zzz", 40.7128, -74.0060).await;
        index.heartbeat("aaa", 40.7128, -74.0060).await;

        let result = index.nearest(40.7128, -74.0060, 5.0, 10, Duration::from_secs(300)).await;
        assert_eq!(result[0].driver_id, "aaa");
        assert_eq!(result[1].driver_id, "zzz");
    }

    #[tokio::test]
    async fn radius_excludes_far_drivers() {
        let index = PresenceIndex::new();
        index.heartbeat("far", 41.5, -75.0).await;
        let result = index.nearest(40.7128, -74.0060, 5.0, 10, Duration::from_secs(300)).await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn stale_entries_are_pruned_on_query() {
        let index = PresenceIndex::new();
        index.entries.write().await.insert(
            "stale".to_owned(),
            PresenceEntry { lat: 40.7128, lng: -74.0060, last_seen: Instant::now() - Duration::from_secs(600) },
        );
        assert_eq!(index.len().await, 1);

        let result = index.nearest(40.7128, -74.0060, 5.0, 10, Duration::from_secs(300)).await;
        assert!(result.is_empty());
        assert_eq!(index.len().await, 0);
    }

    #[tokio::test]
    async fn mark_offline_removes_synchronously() {
        let index = PresenceIndex::new();
        index.heartbeat("d1", 40.7128, -74.0060).await;
        index.mark_offline("d1").await;
        assert_eq!(index.len().await, 0);
    }

    #[tokio::test]
    async fn limit_truncates_result() {
        let index = PresenceIndex::new();
        for i in 0..5 {
            index.heartbeat(&format!("d{i}"), 40.7128, -74.0060).await;
        }
        let result = index.nearest(40.7128, -74.0060, 5.0, 2, Duration::from_secs(300)).await;
        assert_eq!(result.len(), 2);
    }
}
