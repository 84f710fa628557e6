// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Access-Rights Cache
//!
//! Local store of externally sourced identity attributes (roles, groups,
//! display metadata), keyed by certificate subject DN and refreshed on a TTL
//! so the authoritative directory is not consulted on every request.
//!
//! - `store` - redb-backed entry store (read/upsert/delete/search)
//! - `provider` - the external access-checker collaborator
//! - `checker` - cache-first lookup path used by the resolver
//! - `refresher` - background TTL refresh task

pub mod checker;
pub mod provider;
pub mod refresher;
pub mod store;

pub use checker::{AccessChecker, AccessError};
pub use provider::{AccessAttributes, AccessProvider, HttpAccessProvider, ProviderError};
pub use refresher::CacheRefresher;
pub use store::{AccessCache, CacheEntry, CacheEntryPage, CacheError, SearchFilter};
