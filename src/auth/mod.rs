// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Trusted-header authentication with delegated identity resolution.
//!
//! ## Auth Flow
//!
//! 1. The SSL-terminating proxy verifies the TLS client certificate and
//!    injects the subject DN (and optionally a proxied or masquerade DN) as
//!    request headers.
//! 2. The gateway trusts those headers without re-verification:
//!    - `TrustedHeaderStrategy` extracts the configured headers in order
//!    - `ProxyPkiVerifier` resolves the effective acting identity through
//!      the access-rights cache, enforcing delegation permissions
//! 3. The resolved `Identity` and its `DelegationOutcome` are attached to
//!    the request; requirement layers authorize it before any handler runs.
//!
//! ## Security
//!
//! - This service must only be reachable through the terminating proxy
//! - Proxy delegation narrows rights to the intersection of both subjects
//! - Masquerade grants the target identity's full rights and is gated on the
//!   subject's own record

pub mod error;
pub mod extractor;
pub mod identity;
pub mod middleware;
pub mod proxy_pki;
pub mod requirements;
pub mod strategy;

pub use error::AuthFailure;
pub use extractor::{Auth, Delegation};
pub use identity::{DelegationOutcome, Identity};
pub use proxy_pki::ProxyPkiVerifier;
pub use strategy::{AuthOutcome, HeaderVerifier, TrustedHeaderStrategy};
