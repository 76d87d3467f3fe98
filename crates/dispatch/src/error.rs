// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the dispatch engine (§7).
//!
//! The engine prefers forward progress over strict propagation: only errors
//! that indicate a request-shaped problem reach callers as 4xx; everything
//! else (store/infra failures) surfaces as 5xx via `http_status`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum DispatchError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("driver is not the current offeree for this request")]
    NotCurrentOfferee,

    #[error("request has already resolved")]
    AlreadyResolved,

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("push delivery failed: {0}")]
    Delivery(String),

    /// Internal-only: `popNext` returned a driver whose presence has since
    /// gone stale. The engine treats this identically to a decline and never
    /// surfaces it to a caller — kept as a variant for log clarity.
    #[error("candidate driver is no longer present")]
    StaleCandidate,
}

impl DispatchError {
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotCurrentOfferee => StatusCode::CONFLICT,
            Self::AlreadyResolved => StatusCode::CONFLICT,
            Self::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Delivery(_) => StatusCode::BAD_GATEWAY,
            Self::StaleCandidate => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotCurrentOfferee => "NOT_CURRENT_OFFEREE",
            Self::AlreadyResolved => "ALREADY_RESOLVED",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Delivery(_) => "DELIVERY_ERROR",
            Self::StaleCandidate => "STALE_CANDIDATE",
        }
    }

    pub fn to_error_body(&self) -> ErrorBody {
        ErrorBody { code: self.code().to_owned(), message: self.to_string() }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let body = ErrorResponse { error: self.to_error_body() };
        (status, Json(body)).into_response()
    }
}

/// Top-level error response envelope for the demo HTTP transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error body with machine-readable code and human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}
