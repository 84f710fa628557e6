// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational PKI Gateway - Trusted-Header Authentication Service
//!
//! Authenticates requests from subject DNs injected by an SSL-terminating
//! proxy, resolves the effective acting identity (which may differ from the
//! certificate subject through proxying or masquerading), and authorizes it
//! against composable requirements, backed by a TTL-refreshed cache of
//! externally sourced access rights.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Trusted-header authentication and authorization
//! - `cache` - Access-rights cache, external provider, background refresh

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod state;
