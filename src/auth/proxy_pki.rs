// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Proxy-PKI identity resolution.
//!
//! The concrete verifier behind [`TrustedHeaderStrategy`]: resolves the
//! effective acting identity from the primary, proxied, and masquerade DN
//! headers.
//!
//! ## Delegation Semantics
//!
//! - **Proxy**: the certificate subject acts *on behalf of* the proxied
//!   subject. The attached identity is the proxied one, with groups and
//!   roles narrowed to the intersection of both subjects' sets.
//! - **Masquerade**: the certificate subject assumes the masquerade
//!   subject's *full* rights, no intersection. A masquerade header from a
//!   subject without the capability is ignored rather than rejected.
//!
//! Secondary subjects are always resolved fresh from the provider, never
//! from a possibly stale cache read, since delegation is a higher-trust
//! operation.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::request::Parts;
use chrono::Utc;
use tracing::{debug, warn};

use crate::cache::checker::{AccessChecker, AccessError};
use crate::cache::provider::ProviderError;

use super::error::AuthFailure;
use super::identity::{DelegationOutcome, Identity};
use super::strategy::{AuthOutcome, HeaderVerifier, StrategyError, TrustedHeaderStrategy};

/// Default trusted header names, in strategy order.
pub const DEFAULT_PRIMARY_USER_HEADER: &str = "x-ssl-client-s-dn";
pub const DEFAULT_PROXIED_USER_HEADER: &str = "x-proxied-user-dn";
pub const DEFAULT_MASQUERADE_USER_HEADER: &str = "x-masquerade-user-dn";

/// Resolver for the proxy-pki header triple.
pub struct ProxyPkiVerifier {
    checker: Arc<AccessChecker>,
    session_max_age: chrono::Duration,
}

impl ProxyPkiVerifier {
    pub fn new(checker: Arc<AccessChecker>, session_max_age: std::time::Duration) -> Self {
        Self {
            checker,
            session_max_age: chrono::Duration::from_std(session_max_age)
                .unwrap_or_else(|_| chrono::Duration::hours(24)),
        }
    }

    /// Wrap this verifier in a strategy over the given header names, ordered
    /// `[primary, proxied, masquerade]`.
    pub fn into_strategy(
        self,
        header_names: [&str; 3],
    ) -> Result<TrustedHeaderStrategy, StrategyError> {
        TrustedHeaderStrategy::new(&header_names, Arc::new(self))
    }

    async fn resolve(&self, dn: &str) -> Result<Identity, AccessError> {
        let attrs = self.checker.resolve(dn).await?;
        Ok(Identity::from_attributes(dn, attrs))
    }

    async fn resolve_fresh(&self, dn: &str) -> Result<Identity, AccessError> {
        let attrs = self.checker.resolve_fresh(dn).await?;
        Ok(Identity::from_attributes(dn, attrs))
    }

    /// Record a login timestamp for an identity whose last login is unknown
    /// or older than the session window. Fire-and-forget: the response never
    /// waits on it and a failure only logs.
    fn touch_stale_login(&self, identity: &Identity) {
        let stale = identity
            .last_login
            .map_or(true, |at| Utc::now() - at > self.session_max_age);
        if !stale {
            return;
        }

        let checker = Arc::clone(&self.checker);
        let dn = identity.subject_dn.clone();
        tokio::spawn(async move {
            if let Err(error) = checker.record_login(&dn).await {
                warn!(subject = %dn, %error, "Failed to record login timestamp");
            }
        });
    }
}

/// Map a resolution error onto the outcome contract: a structured provider
/// denial passes through unchanged, anything else is normalized so internal
/// detail never reaches the client.
fn fail_from(error: AccessError) -> AuthOutcome {
    match error {
        AccessError::Provider(ProviderError::Denied {
            status,
            kind,
            message,
        }) => {
            let status = axum::http::StatusCode::from_u16(status)
                .unwrap_or(axum::http::StatusCode::FORBIDDEN);
            AuthOutcome::Fail(AuthFailure::new(status, kind, message))
        }
        other => {
            warn!(error = %other, "Identity resolution failed");
            AuthOutcome::Fail(AuthFailure::generic())
        }
    }
}

#[async_trait]
impl HeaderVerifier for ProxyPkiVerifier {
    async fn verify(&self, _parts: &Parts, values: &[Option<String>]) -> AuthOutcome {
        let primary_dn = values.first().cloned().flatten();
        let proxied_dn = values.get(1).cloned().flatten();
        let masquerade_dn = values.get(2).cloned().flatten();

        let Some(primary_dn) = primary_dn else {
            return AuthOutcome::Fail(AuthFailure::missing_credentials());
        };

        let primary = match self.resolve(&primary_dn).await {
            Ok(identity) => identity,
            Err(error) => return fail_from(error),
        };

        if let Some(proxied_dn) = proxied_dn {
            if !primary.can_proxy {
                return AuthOutcome::Fail(AuthFailure::authentication_error(
                    "Not approved to proxy users. Please verify your credentials.",
                ));
            }

            let mut secondary = match self.resolve_fresh(&proxied_dn).await {
                Ok(identity) => identity,
                Err(error) => return fail_from(error),
            };
            self.touch_stale_login(&secondary);

            // Delegation never grants the proxied identity rights the
            // certificate subject does not also hold.
            secondary.intersect_rights(&primary);
            return AuthOutcome::Success(secondary, DelegationOutcome::Proxied);
        }

        if let Some(masquerade_dn) = masquerade_dn {
            if primary.can_masquerade {
                let secondary = match self.resolve_fresh(&masquerade_dn).await {
                    Ok(identity) => identity,
                    Err(error) => return fail_from(error),
                };
                self.touch_stale_login(&secondary);
                return AuthOutcome::Success(secondary, DelegationOutcome::Masqueraded);
            }
            // Not an error: the header is ignored and the certificate
            // subject authenticates as itself.
            debug!(
                subject = %primary.subject_dn,
                "Masquerade header ignored for subject without the capability"
            );
        }

        AuthOutcome::Success(primary, DelegationOutcome::Primary)
    }
}
