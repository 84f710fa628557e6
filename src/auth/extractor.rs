// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the authenticated identity.
//!
//! Use the `Auth` extractor in handlers behind the authentication layer:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(identity): Auth) -> impl IntoResponse {
//!     // identity is the resolved acting Identity
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::error::AuthFailure;
use super::identity::{DelegationOutcome, Identity};

/// Extractor for the identity attached by the authentication middleware.
///
/// Rejects when no identity is present, i.e. when a route was mounted
/// outside the authenticated subtree by mistake.
pub struct Auth(pub Identity);

impl<S: Send + Sync> FromRequestParts<S> for Auth {
    type Rejection = AuthFailure;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(Auth)
            .ok_or_else(|| AuthFailure::invalid_credentials("Request is not authenticated"))
    }
}

/// Extractor for the delegation tag attached alongside the identity.
///
/// Defaults to `Primary` when the tag is absent.
pub struct Delegation(pub DelegationOutcome);

impl<S: Send + Sync> FromRequestParts<S> for Delegation {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Delegation(
            parts
                .extensions
                .get::<DelegationOutcome>()
                .copied()
                .unwrap_or(DelegationOutcome::Primary),
        ))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Request, StatusCode};

    use super::*;
    use crate::cache::AccessAttributes;

    fn parts() -> Parts {
        Request::builder().uri("/test").body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn auth_extractor_requires_attached_identity() {
        let mut parts = parts();
        let result = Auth::from_request_parts(&mut parts, &()).await;
        let failure = result.err().unwrap();
        assert_eq!(failure.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_extractor_reads_extension() {
        let mut parts = parts();
        parts
            .extensions
            .insert(Identity::from_attributes("cn=alice", AccessAttributes::default()));

        let Auth(identity) = Auth::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(identity.subject_dn, "cn=alice");
    }

    #[tokio::test]
    async fn delegation_extractor_defaults_to_primary() {
        let mut parts = parts();
        let Delegation(tag) = Delegation::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(tag, DelegationOutcome::Primary);

        parts.extensions.insert(DelegationOutcome::Masqueraded);
        let Delegation(tag) = Delegation::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(tag, DelegationOutcome::Masqueraded);
    }
}
