// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Generic trusted-header authentication strategy.
//!
//! Reads a fixed ordered set of header values from the request and hands
//! them to a pluggable verifier, which settles the attempt in exactly one of
//! three terminal states: success with an identity, a structured failure, or
//! an error. The strategy itself knows nothing about what the headers mean.
//!
//! Header values are trusted as-is: the SSL-terminating proxy in front of
//! this service has already verified the client certificate and injected the
//! subject DNs. The strategy must therefore only ever run behind that proxy.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{request::Parts, HeaderName};
use futures::FutureExt;

use super::error::AuthFailure;
use super::identity::{DelegationOutcome, Identity};

/// Terminal state of one authentication attempt.
#[derive(Debug)]
pub enum AuthOutcome {
    /// Authenticated; the delegation tag records which identity was attached.
    Success(Identity, DelegationOutcome),
    /// Structured rejection, surfaced to the client verbatim.
    Fail(AuthFailure),
    /// Unexpected failure; normalized before it reaches a client.
    Error(VerifyError),
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("verification callback panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Upstream(String),
}

/// Strategy construction errors. Surfaced at startup, never at request time.
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("at least one trusted header name is required")]
    NoHeaders,

    #[error("invalid header name '{0}'")]
    InvalidHeaderName(String),
}

/// Pluggable verification hook.
///
/// Receives the request parts and the configured header values in
/// configuration order; absent or empty headers arrive as `None`.
#[async_trait]
pub trait HeaderVerifier: Send + Sync {
    async fn verify(&self, parts: &Parts, values: &[Option<String>]) -> AuthOutcome;
}

/// Authentication mechanism extracting an ordered set of trusted headers.
pub struct TrustedHeaderStrategy {
    header_names: Vec<HeaderName>,
    verifier: Arc<dyn HeaderVerifier>,
}

impl TrustedHeaderStrategy {
    /// Build a strategy over the given header names and verifier.
    ///
    /// Fails on an empty or invalid header list.
    pub fn new<S: AsRef<str>>(
        header_names: &[S],
        verifier: Arc<dyn HeaderVerifier>,
    ) -> Result<Self, StrategyError> {
        if header_names.is_empty() {
            return Err(StrategyError::NoHeaders);
        }
        let header_names = header_names
            .iter()
            .map(|name| {
                HeaderName::from_lowercase(name.as_ref().to_lowercase().as_bytes())
                    .map_err(|_| StrategyError::InvalidHeaderName(name.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            header_names,
            verifier,
        })
    }

    pub fn header_names(&self) -> &[HeaderName] {
        &self.header_names
    }

    /// Run one authentication attempt against the request parts.
    ///
    /// A verifier panic is contained and routed to [`AuthOutcome::Error`];
    /// the strategy never lets a callback failure escape.
    pub async fn authenticate(&self, parts: &Parts) -> AuthOutcome {
        let values: Vec<Option<String>> = self
            .header_names
            .iter()
            .map(|name| {
                parts
                    .headers
                    .get(name)
                    .and_then(|value| value.to_str().ok())
                    .map(|value| value.trim().to_string())
                    .filter(|value| !value.is_empty())
            })
            .collect();

        match AssertUnwindSafe(self.verifier.verify(parts, &values))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => AuthOutcome::Error(VerifyError::Panicked(panic_message(panic.as_ref()))),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    /// Verifier that echoes the received values back through the identity.
    struct CapturingVerifier;

    #[async_trait]
    impl HeaderVerifier for CapturingVerifier {
        async fn verify(&self, _parts: &Parts, values: &[Option<String>]) -> AuthOutcome {
            let joined = values
                .iter()
                .map(|v| v.clone().unwrap_or_else(|| "<none>".to_string()))
                .collect::<Vec<_>>()
                .join("|");
            AuthOutcome::Success(
                Identity::from_attributes(joined, Default::default()),
                DelegationOutcome::Primary,
            )
        }
    }

    struct PanickingVerifier;

    #[async_trait]
    impl HeaderVerifier for PanickingVerifier {
        async fn verify(&self, _parts: &Parts, _values: &[Option<String>]) -> AuthOutcome {
            panic!("verifier exploded");
        }
    }

    fn parts_with(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/test");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn construction_requires_headers() {
        let result = TrustedHeaderStrategy::new::<&str>(&[], Arc::new(CapturingVerifier));
        assert!(matches!(result, Err(StrategyError::NoHeaders)));
    }

    #[test]
    fn construction_rejects_invalid_header_name() {
        let result =
            TrustedHeaderStrategy::new(&["not a header"], Arc::new(CapturingVerifier));
        assert!(matches!(result, Err(StrategyError::InvalidHeaderName(_))));
    }

    #[tokio::test]
    async fn values_arrive_in_configured_order() {
        let strategy = TrustedHeaderStrategy::new(
            &["x-first", "x-second", "x-third"],
            Arc::new(CapturingVerifier),
        )
        .unwrap();

        // Third header absent, second empty after trimming.
        let parts = parts_with(&[("x-first", "one"), ("x-second", "  ")]);
        match strategy.authenticate(&parts).await {
            AuthOutcome::Success(identity, _) => {
                assert_eq!(identity.subject_dn, "one|<none>|<none>");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn header_names_are_case_insensitive() {
        let strategy =
            TrustedHeaderStrategy::new(&["X-SSL-Client-S-DN"], Arc::new(CapturingVerifier))
                .unwrap();

        let parts = parts_with(&[("x-ssl-client-s-dn", "cn=alice")]);
        match strategy.authenticate(&parts).await {
            AuthOutcome::Success(identity, _) => assert_eq!(identity.subject_dn, "cn=alice"),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn verifier_panic_becomes_error_outcome() {
        let strategy =
            TrustedHeaderStrategy::new(&["x-test"], Arc::new(PanickingVerifier)).unwrap();

        let parts = parts_with(&[]);
        match strategy.authenticate(&parts).await {
            AuthOutcome::Error(VerifyError::Panicked(message)) => {
                assert!(message.contains("verifier exploded"));
            }
            other => panic!("expected panic error, got {other:?}"),
        }
    }
}
