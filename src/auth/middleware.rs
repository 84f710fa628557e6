// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Runs the trusted-header strategy for every request on the protected
//! subtree. On success the resolved identity and its delegation tag are
//! inserted into the request extensions for handlers and requirement layers
//! to read; on failure the structured rejection is returned as-is; on an
//! unexpected error a normalized generic failure is returned so internal
//! detail never reaches the client.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::state::AppState;

use super::error::AuthFailure;
use super::strategy::AuthOutcome;

/// Authentication middleware function.
///
/// Apply with `axum::middleware::from_fn_with_state(state, authenticate)`.
pub async fn authenticate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    match state.strategy.authenticate(&parts).await {
        AuthOutcome::Success(identity, delegation) => {
            parts.extensions.insert(identity);
            parts.extensions.insert(delegation);
            next.run(Request::from_parts(parts, body)).await
        }
        AuthOutcome::Fail(failure) => {
            warn!(status = %failure.status, kind = %failure.kind, "Authentication rejected");
            failure.into_response()
        }
        AuthOutcome::Error(err) => {
            error!(error = %err, "Authentication errored");
            AuthFailure::generic().into_response()
        }
    }
}
