// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared application state (§9 Design Notes: "Global state"). The presence
//! index, request store, and ports are process-wide singletons held behind
//! `Arc`, following the teacher's `MuxState` convention.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::admission::AdmissionApi;
use crate::config::DispatchConfig;
use crate::engine::{DispatchEngine, EngineTimeouts};
use crate::notify::NotificationDispatcher;
use crate::ports::{InMemoryRideStore, InMemoryUserStore, LoggingPushTransport, PushTransport, RideStore, UserStore};
use crate::presence::PresenceIndex;
use crate::queue::CandidateQueue;
use crate::status::StatusReader;
use crate::store::RequestStore;
use crate::timer::{spawn_sweeper, OfferTimer};

/// Everything a request handler needs, wired once at startup.
pub struct AppState {
    pub config: DispatchConfig,
    pub shutdown: CancellationToken,
    pub presence: Arc<PresenceIndex>,
    pub admission: Arc<AdmissionApi>,
    pub status_reader: Arc<StatusReader>,
    pub user_store: Arc<dyn UserStore>,
    pub ride_store: Arc<dyn RideStore>,
}

impl AppState {
    /// Build the full component graph: store, queue, timer, notifier, engine,
    /// admission API, then spawn the durable sweeper and the task that turns
    /// timer/sweeper events into `DispatchEngine::timeout` calls.
    pub fn new(config: DispatchConfig, shutdown: CancellationToken) -> Arc<Self> {
        Self::with_ports(
            config,
            shutdown,
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemoryRideStore::new()),
            Arc::new(LoggingPushTransport),
        )
    }

    /// Build with caller-supplied ports, for tests that need to seed users
    /// or assert on push delivery.
    pub fn with_ports(
        config: DispatchConfig,
        shutdown: CancellationToken,
        user_store: Arc<dyn UserStore>,
        ride_store: Arc<dyn RideStore>,
        push_transport: Arc<dyn PushTransport>,
    ) -> Arc<Self> {
        let presence = Arc::new(PresenceIndex::new());
        let request_store = Arc::new(RequestStore::new());
        let queue = Arc::new(CandidateQueue::new());

        let (timeout_tx, mut timeout_rx) = tokio::sync::mpsc::channel(1024);
        let timer = OfferTimer::new(timeout_tx.clone());

        let notifier = Arc::new(NotificationDispatcher::new(Arc::clone(&user_store), push_transport));

        let timeouts = EngineTimeouts {
            offer: config.offer_timeout(),
            accepted_ttl: config.accepted_ttl(),
            offeree_ttl: config.offeree_ttl(),
        };
        let engine = Arc::new(DispatchEngine::new(
            Arc::clone(&request_store),
            queue,
            Arc::clone(&timer),
            Arc::clone(&notifier),
            timeouts,
        ));

        let admission = Arc::new(AdmissionApi::new(
            Arc::clone(&ride_store),
            Arc::clone(&request_store),
            Arc::clone(&presence),
            Arc::clone(&engine),
            Arc::clone(&notifier),
            config.clone(),
        ));
        let status_reader = Arc::new(StatusReader::new(Arc::clone(&request_store)));

        spawn_sweeper(Arc::clone(&request_store), timeout_tx, config.sweeper_interval(), shutdown.clone());

        // Drain timer/sweeper events into engine.timeout until shutdown.
        let event_engine = Arc::clone(&engine);
        let event_shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = event_shutdown.cancelled() => break,
                    event = timeout_rx.recv() => {
                        let Some(event) = event else { break };
                        if let Err(err) = event_engine.timeout(event.request_id, &event.driver_id).await {
                            tracing::warn!(request_id = %event.request_id, driver_id = %event.driver_id, error = %err, "timeout handling failed");
                        }
                    }
                }
            }
        });

        Arc::new(Self { config, shutdown, presence, admission, status_reader, user_store, ride_store })
    }
}
