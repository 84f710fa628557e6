// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded access-rights cache backed by redb (pure Rust, ACID).
//!
//! Holds externally sourced identity attributes keyed by subject DN so the
//! authoritative directory is not consulted on every request. Entries carry
//! the time they were last fetched; the background refresher re-fetches
//! entries whose timestamp has fallen outside the refresh window.
//!
//! ## Table Layout
//!
//! - `access_entries`: subject DN → serialized CacheEntry (JSON bytes)

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Primary table: subject DN → serialized CacheEntry (JSON bytes).
const ACCESS_ENTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("access_entries");

/// Page size applied when a search request does not specify one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Upper bound on requested page sizes.
pub const MAX_PAGE_SIZE: usize = 100;

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("cache value is not serializable: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("stored entry is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

// =============================================================================
// Entry Model
// =============================================================================

/// A single cached access-rights record.
///
/// `value` holds the attributes exactly as the external provider returned
/// them; `value_serialized` is the canonical JSON string of `value`,
/// maintained on every upsert so free-text search can match against it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CacheEntry {
    /// External subject identifier (certificate DN).
    pub key: String,
    /// When this entry's value was last (re)fetched from the provider.
    pub timestamp: DateTime<Utc>,
    /// Externally sourced attributes (roles, groups, display metadata).
    #[schema(value_type = Object)]
    pub value: serde_json::Value,
    /// Canonical JSON string of `value`.
    pub value_serialized: String,
}

/// One page of search results with deterministic key ordering.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CacheEntryPage {
    pub entries: Vec<CacheEntry>,
    /// Zero-based page index.
    pub page: usize,
    pub page_size: usize,
    /// Total entries matching the filter, across all pages.
    pub total: usize,
}

/// Search filter: free-text containment plus an exact key-prefix match.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Case-sensitive containment over `key` and `value_serialized`.
    pub text: Option<String>,
    /// Restrict to keys starting with this prefix.
    pub key_prefix: Option<String>,
}

impl SearchFilter {
    fn matches(&self, entry: &CacheEntry) -> bool {
        if let Some(prefix) = &self.key_prefix {
            if !entry.key.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(text) = &self.text {
            if !entry.key.contains(text.as_str())
                && !entry.value_serialized.contains(text.as_str())
            {
                return false;
            }
        }
        true
    }
}

// =============================================================================
// AccessCache
// =============================================================================

/// Embedded ACID store for access-rights entries.
///
/// Concurrent upserts for the same key are not mutually excluded beyond
/// redb's single-writer transaction: last write wins, and a lost update is
/// corrected by the next refresh cycle.
pub struct AccessCache {
    db: Database,
}

impl AccessCache {
    /// Open (or create) the cache database at the given path.
    pub fn open(path: &Path) -> CacheResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCESS_ENTRIES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Look up the canonical entry for a key.
    pub fn read(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCESS_ENTRIES)?;
        match table.get(key)? {
            Some(value) => {
                let entry = serde_json::from_slice(value.value()).map_err(CacheError::Corrupt)?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Insert or fully replace the entry for a key.
    ///
    /// Serializes `value`, stamps the entry with the current time, and
    /// replaces any prior row. A value that cannot be serialized fails with
    /// [`CacheError::Serialization`] and leaves the prior entry untouched.
    pub fn upsert<T: Serialize>(&self, key: &str, value: &T) -> CacheResult<CacheEntry> {
        let value = serde_json::to_value(value).map_err(CacheError::Serialization)?;
        let value_serialized =
            serde_json::to_string(&value).map_err(CacheError::Serialization)?;

        let entry = CacheEntry {
            key: key.to_string(),
            timestamp: Utc::now(),
            value,
            value_serialized,
        };
        let json = serde_json::to_vec(&entry).map_err(CacheError::Serialization)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ACCESS_ENTRIES)?;
            table.insert(key, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(entry)
    }

    /// Remove the entry for a key, returning it if present.
    pub fn delete(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(ACCESS_ENTRIES)?;
            let removed = match table.remove(key)? {
                Some(value) => {
                    Some(serde_json::from_slice(value.value()).map_err(CacheError::Corrupt)?)
                }
                None => None,
            };
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Paginated search over all entries, ordered by key.
    ///
    /// `page` is zero-based. An unspecified page size defaults to
    /// [`DEFAULT_PAGE_SIZE`]; requests above [`MAX_PAGE_SIZE`] are capped.
    pub fn search(
        &self,
        page: usize,
        page_size: Option<usize>,
        filter: &SearchFilter,
    ) -> CacheResult<CacheEntryPage> {
        let page_size = page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCESS_ENTRIES)?;

        // The table iterates in key order, which gives the deterministic
        // ordering the pagination contract requires.
        let mut matched = 0usize;
        let skip = page * page_size;
        let mut entries = Vec::with_capacity(page_size);

        for row in table.iter()? {
            let row = row?;
            let entry: CacheEntry =
                serde_json::from_slice(row.1.value()).map_err(CacheError::Corrupt)?;
            if !filter.matches(&entry) {
                continue;
            }
            if matched >= skip && entries.len() < page_size {
                entries.push(entry);
            }
            matched += 1;
        }

        Ok(CacheEntryPage {
            entries,
            page,
            page_size,
            total: matched,
        })
    }

    /// Keys of all entries last fetched before `now - window`.
    pub fn stale_keys(&self, window: Duration) -> CacheResult<Vec<String>> {
        let cutoff = Utc::now() - window;
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCESS_ENTRIES)?;

        let mut keys = Vec::new();
        for row in table.iter()? {
            let row = row?;
            let entry: CacheEntry =
                serde_json::from_slice(row.1.value()).map_err(CacheError::Corrupt)?;
            if entry.timestamp < cutoff {
                keys.push(entry.key);
            }
        }
        Ok(keys)
    }

    /// Number of cached entries.
    pub fn len(&self) -> CacheResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCESS_ENTRIES)?;
        let mut count = 0u64;
        for row in table.iter()? {
            row?;
            count += 1;
        }
        Ok(count)
    }

    /// Write an entry verbatim, timestamp included. Lets tests age entries
    /// without a clock abstraction.
    #[cfg(test)]
    pub(crate) fn replace_raw_for_tests(&self, entry: &CacheEntry) {
        let json = serde_json::to_vec(entry).unwrap();
        let write_txn = self.db.begin_write().unwrap();
        {
            let mut table = write_txn.open_table(ACCESS_ENTRIES).unwrap();
            table.insert(entry.key.as_str(), json.as_slice()).unwrap();
        }
        write_txn.commit().unwrap();
    }
}
