// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Cache Refresher
//!
//! Background task that keeps access-rights entries current without ever
//! blocking a request: stale reads still succeed, and freshness is restored
//! here, out-of-band.
//!
//! ## Strategy
//!
//! Every `interval` (default 8 h) the refresher:
//! 1. Collects all entries whose timestamp has fallen outside the refresh
//!    window.
//! 2. Dispatches a provider re-fetch for each, all concurrently, with no
//!    ordering guarantee between them. There is no concurrency cap; a very
//!    large stale set fans out as many provider calls.
//! 3. Waits for every dispatched refresh to settle. A single entry's failure
//!    is logged and isolated: siblings and the run continue, and the entry
//!    stays stale, so the next run retries it naturally.
//!
//! Most runs find nothing stale and do nothing.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::checker::AccessChecker;

/// Background refresher for stale access-rights entries.
pub struct CacheRefresher {
    checker: Arc<AccessChecker>,
    interval: Duration,
    refresh_window: chrono::Duration,
}

impl CacheRefresher {
    pub fn new(checker: Arc<AccessChecker>, interval: Duration, refresh_window: Duration) -> Self {
        Self {
            checker,
            interval,
            refresh_window: chrono::Duration::from_std(refresh_window)
                .unwrap_or_else(|_| chrono::Duration::hours(8)),
        }
    }

    /// Run the refresh loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(refresher.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            window_secs = self.refresh_window.num_seconds(),
            "Cache refresher starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Cache refresher shutting down");
                return;
            }

            self.refresh_step().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Cache refresher shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one refresh sweep: find stale entries and re-fetch each.
    async fn refresh_step(&self) {
        let stale = match self.checker.cache().stale_keys(self.refresh_window) {
            Ok(keys) => keys,
            Err(error) => {
                warn!(%error, "Cache refresher: failed to scan for stale entries");
                return;
            }
        };

        if stale.is_empty() {
            debug!("Cache refresher: no stale entries");
            return;
        }

        info!(count = stale.len(), "Cache refresher: refreshing stale entries");

        let refreshes = stale.iter().map(|key| async move {
            match self.checker.refresh_entry(key).await {
                Ok(()) => {
                    debug!(key = %key, "Cache refresher: refreshed entry");
                }
                Err(error) => {
                    warn!(key = %key, %error, "Cache refresher: failed to refresh entry");
                }
            }
        });
        join_all(refreshes).await;
    }
}
