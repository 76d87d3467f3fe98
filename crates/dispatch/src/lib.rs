// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ride-dispatch engine: matches a passenger's ride request to exactly one
//! nearby driver by sequentially offering the request to candidate drivers
//! until one accepts or the candidate list is exhausted.

pub mod admission;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod geo;
pub mod notify;
pub mod ports;
pub mod presence;
pub mod queue;
pub mod state;
pub mod status;
pub mod store;
pub mod timer;
pub mod transport;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::DispatchConfig;
use crate::state::AppState;
use crate::transport::build_router;

/// Run the dispatch engine's demo HTTP transport until shutdown.
///
/// Graceful shutdown: the cancellation token stops admitting new requests
/// and lets in-flight `advance` calls and armed timers run to their next
/// natural suspension point before the process exits (§5).
pub async fn run(config: DispatchConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();

    let state = AppState::new(config, shutdown.clone());

    tracing::info!("ride-dispatch listening on {addr}");
    let router = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    Ok(())
}
