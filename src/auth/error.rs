// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Structured authentication and authorization failures.
//!
//! Failures produced inside the pipeline carry `{status, type, message}` and
//! pass through to the HTTP layer verbatim. Anything unstructured is
//! normalized to a generic `authentication-error` before it reaches a client
//! so internal detail never leaks.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// A structured `{status, type, message}` rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFailure {
    pub status: StatusCode,
    /// Machine-readable failure type, e.g. `missing-credentials`.
    pub kind: String,
    pub message: String,
}

#[derive(Serialize)]
struct AuthFailureBody {
    status: u16,
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

impl AuthFailure {
    pub fn new(status: StatusCode, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// No primary subject header on the request.
    pub fn missing_credentials() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "missing-credentials",
            "Missing certificate",
        )
    }

    /// Authenticated but not entitled to the requested operation.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "unauthorized", message)
    }

    /// Credentials were presented but do not resolve to a valid identity.
    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "invalid-credentials", message)
    }

    /// Resolution failed for reasons opaque to the caller.
    pub fn authentication_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "authentication-error", message)
    }

    /// The generic normalization target for unstructured errors.
    pub fn generic() -> Self {
        Self::authentication_error(
            "Could not authenticate request due to invalid credentials",
        )
    }
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.status, self.kind, self.message)
    }
}

impl std::error::Error for AuthFailure {}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        let body = Json(AuthFailureBody {
            status: self.status.as_u16(),
            kind: self.kind,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}
