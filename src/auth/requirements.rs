// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization requirements and their AND/OR combinators.
//!
//! A requirement is an async predicate over the request context. Combinators
//! compose requirements into middleware at route-registration time:
//!
//! ```rust,ignore
//! let admin = all_of(vec![authenticated(), has_role("admin")]);
//! Router::new()
//!     .route("/admin/cache", get(search_entries))
//!     .layer(middleware::from_fn(move |req, next| {
//!         enforce(admin.clone(), req, next)
//!     }));
//! ```
//!
//! Evaluation is strictly sequential in list order, never parallel: later
//! requirements may rely on request annotations written by earlier ones.
//! Combinators never synthesize their own error text; the surfaced failure
//! is always one produced by a requirement.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use super::error::AuthFailure;
use super::identity::Identity;

/// An authorization predicate evaluated against the request context.
///
/// Implementations hold no request-scoped state; one instance is reused
/// across many concurrent requests.
#[async_trait]
pub trait Requirement: Send + Sync {
    async fn check(&self, request: &mut Request) -> Result<(), AuthFailure>;
}

/// Handle shared between a route layer and the combinators that nest it.
pub type SharedRequirement = Arc<dyn Requirement>;

/// Middleware shape over a single requirement: on success the request
/// proceeds, on rejection the failure becomes the response verbatim.
pub async fn enforce(
    requirement: SharedRequirement,
    mut request: Request,
    next: Next,
) -> Response {
    match requirement.check(&mut request).await {
        Ok(()) => next.run(request).await,
        Err(failure) => failure.into_response(),
    }
}

// =============================================================================
// Combinators
// =============================================================================

struct AllOf {
    requirements: Vec<SharedRequirement>,
}

#[async_trait]
impl Requirement for AllOf {
    async fn check(&self, request: &mut Request) -> Result<(), AuthFailure> {
        // Sequential with early return: requirements after the first failure
        // are never evaluated.
        for requirement in &self.requirements {
            requirement.check(request).await?;
        }
        Ok(())
    }
}

struct AnyOf {
    requirements: Vec<SharedRequirement>,
}

#[async_trait]
impl Requirement for AnyOf {
    async fn check(&self, request: &mut Request) -> Result<(), AuthFailure> {
        if self.requirements.is_empty() {
            // Vacuous pass, kept from the source semantics. An empty OR over
            // a security gate is almost certainly a misconfiguration, so it
            // is at least made visible.
            warn!("Empty requirement list evaluated as an automatic pass");
            return Ok(());
        }

        let mut last_failure = None;
        for requirement in &self.requirements {
            match requirement.check(request).await {
                // First success wins; nothing after it is evaluated.
                Ok(()) => return Ok(()),
                Err(failure) => last_failure = Some(failure),
            }
        }
        Err(last_failure.expect("non-empty requirement list"))
    }
}

/// Every requirement must pass, evaluated in order, first failure surfaced.
pub fn all_of(requirements: Vec<SharedRequirement>) -> SharedRequirement {
    Arc::new(AllOf { requirements })
}

/// At least one requirement must pass; evaluated in order, first success
/// wins, the last failure is surfaced when all fail.
pub fn any_of(requirements: Vec<SharedRequirement>) -> SharedRequirement {
    Arc::new(AnyOf { requirements })
}

// =============================================================================
// Concrete Requirements
// =============================================================================

fn attached_identity(request: &Request) -> Result<&Identity, AuthFailure> {
    request
        .extensions()
        .get::<Identity>()
        .ok_or_else(|| AuthFailure::invalid_credentials("Request is not authenticated"))
}

struct Authenticated;

#[async_trait]
impl Requirement for Authenticated {
    async fn check(&self, request: &mut Request) -> Result<(), AuthFailure> {
        attached_identity(request).map(|_| ())
    }
}

struct HasRole {
    role: String,
}

#[async_trait]
impl Requirement for HasRole {
    async fn check(&self, request: &mut Request) -> Result<(), AuthFailure> {
        let identity = attached_identity(request)?;
        if identity.has_role(&self.role) {
            Ok(())
        } else {
            Err(AuthFailure::unauthorized(format!(
                "Missing required role '{}'",
                self.role
            )))
        }
    }
}

struct HasGroup {
    group: String,
}

#[async_trait]
impl Requirement for HasGroup {
    async fn check(&self, request: &mut Request) -> Result<(), AuthFailure> {
        let identity = attached_identity(request)?;
        if identity.has_group(&self.group) {
            Ok(())
        } else {
            Err(AuthFailure::unauthorized(format!(
                "Missing required group '{}'",
                self.group
            )))
        }
    }
}

/// An identity is attached to the request.
pub fn authenticated() -> SharedRequirement {
    Arc::new(Authenticated)
}

/// The attached identity holds the given external role.
pub fn has_role(role: impl Into<String>) -> SharedRequirement {
    Arc::new(HasRole { role: role.into() })
}

/// The attached identity belongs to the given external group.
pub fn has_group(group: impl Into<String>) -> SharedRequirement {
    Arc::new(HasGroup {
        group: group.into(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::body::Body;
    use axum::http::StatusCode;

    use super::*;
    use crate::cache::AccessAttributes;

    /// Requirement that counts its invocations and settles with a fixed
    /// result.
    struct Counting {
        calls: Arc<AtomicUsize>,
        result: Result<(), AuthFailure>,
    }

    fn counting(result: Result<(), AuthFailure>) -> (SharedRequirement, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Arc::new(Counting {
                calls: calls.clone(),
                result,
            }),
            calls,
        )
    }

    #[async_trait]
    impl Requirement for Counting {
        async fn check(&self, _request: &mut Request) -> Result<(), AuthFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn failure(message: &str) -> AuthFailure {
        AuthFailure::unauthorized(message)
    }

    fn request() -> Request {
        Request::builder().uri("/test").body(Body::empty()).unwrap()
    }

    fn request_with_identity(roles: &[&str], groups: &[&str]) -> Request {
        let identity = Identity::from_attributes(
            "cn=test",
            AccessAttributes {
                roles: roles.iter().map(|s| s.to_string()).collect(),
                groups: groups.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
        );
        let mut request = request();
        request.extensions_mut().insert(identity);
        request
    }

    #[tokio::test]
    async fn all_of_passes_when_every_requirement_passes() {
        let (first, first_calls) = counting(Ok(()));
        let (second, second_calls) = counting(Ok(()));

        let combined = all_of(vec![first, second]);
        assert!(combined.check(&mut request()).await.is_ok());
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_of_short_circuits_on_first_failure() {
        let (first, first_calls) = counting(Ok(()));
        let (second, second_calls) = counting(Err(failure("second")));
        let (third, third_calls) = counting(Err(failure("third")));

        let combined = all_of(vec![first, second, third]);
        let err = combined.check(&mut request()).await.unwrap_err();

        // The first failing requirement is the one surfaced, and nothing
        // after it ran.
        assert_eq!(err.message, "second");
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn all_of_empty_passes() {
        assert!(all_of(vec![]).check(&mut request()).await.is_ok());
    }

    #[tokio::test]
    async fn any_of_first_success_wins() {
        let (first, first_calls) = counting(Err(failure("first")));
        let (second, second_calls) = counting(Ok(()));
        let (third, third_calls) = counting(Ok(()));

        let combined = any_of(vec![first, second, third]);
        assert!(combined.check(&mut request()).await.is_ok());
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn any_of_surfaces_last_failure_when_all_fail() {
        let (first, _) = counting(Err(failure("first")));
        let (second, _) = counting(Err(failure("second")));

        let combined = any_of(vec![first, second]);
        let err = combined.check(&mut request()).await.unwrap_err();
        assert_eq!(err.message, "second");
    }

    #[tokio::test]
    async fn any_of_empty_passes() {
        assert!(any_of(vec![]).check(&mut request()).await.is_ok());
    }

    #[tokio::test]
    async fn combinators_nest() {
        let (fail_a, _) = counting(Err(failure("a")));
        let (ok_b, _) = counting(Ok(()));
        let (ok_c, _) = counting(Ok(()));

        let combined = all_of(vec![any_of(vec![fail_a, ok_b]), ok_c]);
        assert!(combined.check(&mut request()).await.is_ok());
    }

    #[tokio::test]
    async fn has_role_checks_attached_identity() {
        let requirement = has_role("admin");

        let mut admin = request_with_identity(&["admin"], &[]);
        assert!(requirement.check(&mut admin).await.is_ok());

        let mut plain = request_with_identity(&["user"], &[]);
        let err = requirement.check(&mut plain).await.unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.kind, "unauthorized");
    }

    #[tokio::test]
    async fn has_group_checks_attached_identity() {
        let requirement = has_group("operators");

        let mut member = request_with_identity(&[], &["operators"]);
        assert!(requirement.check(&mut member).await.is_ok());

        let mut outsider = request_with_identity(&[], &[]);
        assert!(requirement.check(&mut outsider).await.is_err());
    }

    #[tokio::test]
    async fn authenticated_rejects_without_identity() {
        let requirement = authenticated();

        let err = requirement.check(&mut request()).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let mut with_identity = request_with_identity(&[], &[]);
        assert!(requirement.check(&mut with_identity).await.is_ok());
    }
}
