// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status projection for external callers (C7, §4.7).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DispatchStatus;
use crate::store::RequestStore;

/// `{status, driverId?, estimatedArrival?}` as returned by `request-status` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStatusView {
    pub status: DispatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_arrival_minutes: Option<u32>,
}

pub struct StatusReader {
    store: Arc<RequestStore>,
}

impl StatusReader {
    pub fn new(store: Arc<RequestStore>) -> Self {
        Self { store }
    }

    /// Reads ephemeral status, defaulting to `pending` if absent (§4.7).
    /// Assigned driver and ETA are only populated once status is `accepted`.
    pub async fn get_status(&self, request_id: Uuid) -> RequestStatusView {
        let status = self.store.get_status(request_id).await;
        if status != DispatchStatus::Accepted {
            return RequestStatusView { status, driver_id: None, estimated_arrival_minutes: None };
        }

        let driver_id = self.store.get_assigned_driver(request_id).await;
        let estimated_arrival_minutes = self.store.get_eta(request_id).await;
        RequestStatusView { status, driver_id, estimated_arrival_minutes }
    }
}
