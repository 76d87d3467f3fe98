// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-request candidate queue (C3, §4.3): an ordered list of driver ids
//! the engine draws from one at a time. Seeding preserves ascending-distance
//! input order; no re-ordering happens after seeding.

use std::collections::{HashMap, VecDeque};

use tokio::sync::RwLock;
use uuid::Uuid;

pub struct CandidateQueue {
    queues: RwLock<HashMap<Uuid, VecDeque<String>>>,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self { queues: RwLock::new(HashMap::new()) }
    }

    /// Install the ordered candidate list for a request, replacing any prior
    /// queue. Returns the seeded length.
    pub async fn seed(&self, request_id: Uuid, candidates: Vec<String>) -> usize {
        let len = candidates.len();
        self.queues.write().await.insert(request_id, candidates.into());
        len
    }

    /// Atomically pop the next candidate, or `None` if the queue is empty or absent.
    pub async fn pop_next(&self, request_id: Uuid) -> Option<String> {
        let mut queues = self.queues.write().await;
        queues.get_mut(&request_id).and_then(|q| q.pop_front())
    }

    /// Remove the queue entirely (on resolution or TTL expiry).
    pub async fn drop_queue(&self, request_id: Uuid) {
        self.queues.write().await.remove(&request_id);
    }

    #[cfg(test)]
    pub async fn remaining(&self, request_id: Uuid) -> usize {
        self.queues.read().await.get(&request_id).map(|q| q.len()).unwrap_or(0)
    }
}

impl Default for CandidateQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seed_preserves_order() {
        let queue = CandidateQueue::new();
        let id = Uuid::new_v4();
        let len = queue.seed(id, vec!["d1".into(), "d2".into(), "d3".into()]).await;
        assert_eq!(len, 3);
        assert_eq!(queue.pop_next(id).await, Some("d1".to_owned()));
        assert_eq!(queue.pop_next(id).await, Some("d2".to_owned()));
        assert_eq!(queue.pop_next(id).await, Some("d3".to_owned()));
        assert_eq!(queue.pop_next(id).await, None);
    }

    #[tokio::test]
    async fn pop_on_unseeded_request_is_none() {
        let queue = CandidateQueue::new();
        assert_eq!(queue.pop_next(Uuid::new_v4()).await, None);
    }

    #[tokio::test]
    async fn drop_clears_remaining_candidates() {
        let queue = CandidateQueue::new();
        let id = Uuid::new_v4();
        queue.seed(id, vec!["d1".into(), "d2".into()]).await;
        queue.drop_queue(id).await;
        assert_eq!(queue.pop_next(id).await, None);
    }

    #[tokio::test]
    async fn reseeding_replaces_prior_queue() {
        let queue = CandidateQueue::new();
        let id = Uuid::new_v4();
        queue.seed(id, vec!["d1".into()]).await;
        queue.seed(id, vec!["d2".into(), "d3".into()]).await;
        assert_eq!(queue.remaining(id).await, 2);
        assert_eq!(queue.pop_next(id).await, Some("d2".to_owned()));
    }
}
