// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::TrustedHeaderStrategy;
use crate::cache::{AccessCache, AccessChecker};
use crate::config::Config;

/// Shared application handles, injected explicitly at startup.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<AccessCache>,
    pub checker: Arc<AccessChecker>,
    pub strategy: Arc<TrustedHeaderStrategy>,
    pub config: Arc<Config>,
}
