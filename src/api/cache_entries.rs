// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin endpoints for access-rights cache entries.
//!
//! Deleting an entry forces a provider lookup on the subject's next request;
//! useful when attributes are known to have changed upstream.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::cache::{CacheEntry, CacheEntryPage, SearchFilter};
use crate::error::ApiError;
use crate::state::AppState;

/// Search parameters; `page` is zero-based.
#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Zero-based page index.
    pub page: Option<usize>,
    /// Page size (default 20, capped at 100).
    pub size: Option<usize>,
    /// Free-text containment over key and serialized value.
    pub q: Option<String>,
    /// Restrict to keys starting with this prefix.
    pub key_prefix: Option<String>,
}

/// Paginated cache entry search.
#[utoipa::path(
    get,
    path = "/v1/admin/cache",
    tag = "Cache",
    params(SearchQuery),
    responses(
        (status = 200, description = "One page of matching entries", body = CacheEntryPage),
        (status = 403, description = "Caller is not an administrator")
    )
)]
pub async fn search_entries(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<CacheEntryPage>, ApiError> {
    let filter = SearchFilter {
        text: query.q,
        key_prefix: query.key_prefix,
    };
    let page = state
        .cache
        .search(query.page.unwrap_or(0), query.size, &filter)?;
    Ok(Json(page))
}

/// Read a single entry by subject DN.
#[utoipa::path(
    get,
    path = "/v1/admin/cache/{key}",
    tag = "Cache",
    params(("key" = String, Path, description = "Subject DN")),
    responses(
        (status = 200, description = "The cached entry", body = CacheEntry),
        (status = 404, description = "No entry for this key")
    )
)]
pub async fn read_entry(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<CacheEntry>, ApiError> {
    state
        .cache
        .read(&key)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Cache entry not found"))
}

/// Delete a single entry by subject DN, returning the removed entry.
#[utoipa::path(
    delete,
    path = "/v1/admin/cache/{key}",
    tag = "Cache",
    params(("key" = String, Path, description = "Subject DN")),
    responses(
        (status = 200, description = "The removed entry", body = CacheEntry),
        (status = 404, description = "No entry for this key")
    )
)]
pub async fn delete_entry(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<CacheEntry>, ApiError> {
    state
        .cache
        .delete(&key)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Cache entry not found"))
}
