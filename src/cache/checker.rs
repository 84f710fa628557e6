// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access-rights lookup path: cache in front of the external provider.
//!
//! Requests resolve attributes through [`AccessChecker::resolve`], which
//! serves from the cache when possible and falls back to the provider on a
//! miss. A stale cache hit still succeeds; freshness is restored out-of-band
//! by the background refresher. Delegation resolution uses
//! [`AccessChecker::resolve_fresh`] to bypass the cache read entirely.

use std::sync::Arc;

use tracing::warn;

use super::provider::{AccessAttributes, AccessProvider, ProviderError};
use super::store::{AccessCache, CacheError};

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Combines the access-rights cache with the authoritative provider.
///
/// Both handles are injected at construction so the resolver and refresher
/// can be exercised against in-memory fakes.
pub struct AccessChecker {
    cache: Arc<AccessCache>,
    provider: Arc<dyn AccessProvider>,
}

impl AccessChecker {
    pub fn new(cache: Arc<AccessCache>, provider: Arc<dyn AccessProvider>) -> Self {
        Self { cache, provider }
    }

    /// Resolve attributes for a subject, cache-first.
    ///
    /// On a miss the provider is consulted and the result cached. A cached
    /// entry whose value no longer deserializes is treated as a miss and
    /// re-fetched rather than failing the request.
    pub async fn resolve(&self, dn: &str) -> Result<AccessAttributes, AccessError> {
        if let Some(entry) = self.cache.read(dn)? {
            match serde_json::from_value::<AccessAttributes>(entry.value) {
                Ok(attrs) => return Ok(attrs),
                Err(error) => {
                    warn!(key = dn, %error, "Discarding undecodable cache entry");
                }
            }
        }
        self.resolve_fresh(dn).await
    }

    /// Resolve attributes directly from the provider and update the cache,
    /// bypassing any cached value.
    pub async fn resolve_fresh(&self, dn: &str) -> Result<AccessAttributes, AccessError> {
        let attrs = self.provider.lookup(dn).await?;
        self.cache.upsert(dn, &attrs)?;
        Ok(attrs)
    }

    /// Re-fetch one cache entry from the provider. The refresher's unit of
    /// work; also usable ad hoc.
    pub async fn refresh_entry(&self, key: &str) -> Result<(), AccessError> {
        self.resolve_fresh(key).await.map(|_| ())
    }

    /// Record a login timestamp for a subject with the provider.
    pub async fn record_login(&self, dn: &str) -> Result<(), ProviderError> {
        self.provider.record_login(dn).await
    }

    pub fn cache(&self) -> &Arc<AccessCache> {
        &self.cache
    }
}
