// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

/// Configuration for the ride-dispatch engine (§6 Configuration table).
#[derive(Debug, Clone, clap::Parser)]
pub struct DispatchConfig {
    /// Host to bind the demo HTTP transport on.
    #[arg(long, default_value = "127.0.0.1", env = "RIDE_DISPATCH_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8080, env = "RIDE_DISPATCH_PORT")]
    pub port: u16,

    /// Per-offer acceptance window, in seconds.
    #[arg(long, default_value_t = 60, env = "OFFER_TIMEOUT_SECONDS")]
    pub offer_timeout_seconds: u64,

    /// Overall dispatch lifetime while pending, in seconds.
    #[arg(long, default_value_t = 600, env = "QUEUE_TTL_SECONDS")]
    pub queue_ttl_seconds: u64,

    /// Accepted-state retention, in seconds.
    #[arg(long, default_value_t = 3600, env = "ACCEPTED_TTL_SECONDS")]
    pub accepted_ttl_seconds: u64,

    /// Response-log retention, in seconds.
    #[arg(long, default_value_t = 86_400, env = "RESPONSE_LOG_TTL_SECONDS")]
    pub response_log_ttl_seconds: u64,

    /// Presence freshness window, in seconds.
    #[arg(long, default_value_t = 300, env = "LIVENESS_TTL_SECONDS")]
    pub liveness_ttl_seconds: u64,

    /// Current-offeree key TTL, in seconds — the durable sweeper's fallback
    /// deadline for a timer that never fired (§4.5).
    #[arg(long, default_value_t = 120, env = "OFFEREE_TTL_SECONDS")]
    pub offeree_ttl_seconds: u64,

    /// Initial candidate search radius, in kilometers.
    #[arg(long, default_value_t = 5.0, env = "SEARCH_RADIUS_KM")]
    pub search_radius_km: f64,

    /// Maximum candidates considered per request.
    #[arg(long, default_value_t = 10, env = "SEARCH_LIMIT")]
    pub search_limit: usize,

    /// How often the durable sweeper scans for lapsed offers, in milliseconds.
    #[arg(long, default_value_t = 5000, env = "SWEEPER_INTERVAL_MS")]
    pub sweeper_interval_ms: u64,
}

impl DispatchConfig {
    pub fn offer_timeout(&self) -> Duration {
        Duration::from_secs(self.offer_timeout_seconds)
    }

    pub fn queue_ttl(&self) -> Duration {
        Duration::from_secs(self.queue_ttl_seconds)
    }

    pub fn accepted_ttl(&self) -> Duration {
        Duration::from_secs(self.accepted_ttl_seconds)
    }

    pub fn response_log_ttl(&self) -> Duration {
        Duration::from_secs(self.response_log_ttl_seconds)
    }

    pub fn liveness_ttl(&self) -> Duration {
        Duration::from_secs(self.liveness_ttl_seconds)
    }

    pub fn offeree_ttl(&self) -> Duration {
        Duration::from_secs(self.offeree_ttl_seconds)
    }

    pub fn sweeper_interval(&self) -> Duration {
        Duration::from_millis(self.sweeper_interval_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
            offer_timeout_seconds: 60,
            queue_ttl_seconds: 600,
            accepted_ttl_seconds: 3600,
            response_log_ttl_seconds: 86_400,
            liveness_ttl_seconds: 300,
            offeree_ttl_seconds: 120,
            search_radius_km: 5.0,
            search_limit: 10,
            sweeper_interval_ms: 5000,
        }
    }
}
