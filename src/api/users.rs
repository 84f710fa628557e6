// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Current-user endpoint.

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{Auth, Delegation, DelegationOutcome, Identity};

/// The acting identity for this request and how it was resolved.
#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentUserResponse {
    pub identity: Identity,
    pub delegation: DelegationOutcome,
}

/// Return the resolved acting identity.
#[utoipa::path(
    get,
    path = "/v1/user/me",
    tag = "Users",
    responses(
        (status = 200, description = "The acting identity", body = CurrentUserResponse),
        (status = 400, description = "No primary subject header"),
        (status = 403, description = "Authentication failed")
    )
)]
pub async fn current_user(
    Auth(identity): Auth,
    Delegation(delegation): Delegation,
) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse {
        identity,
        delegation,
    })
}
