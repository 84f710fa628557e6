// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup and fails fast on
//! anything malformed; nothing is re-read at request time.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for the access cache database | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `ACCESS_CHECKER_URL` | Base URL of the external access-checker provider | Required |
//! | `PRIMARY_USER_HEADER` | Trusted header carrying the certificate subject DN | `x-ssl-client-s-dn` |
//! | `PROXIED_USER_HEADER` | Trusted header carrying the proxied subject DN | `x-proxied-user-dn` |
//! | `MASQUERADE_USER_HEADER` | Trusted header carrying the masquerade subject DN | `x-masquerade-user-dn` |
//! | `REFRESH_WINDOW_MS` | Cache entry age before it is eligible for refresh | `28800000` (8 h) |
//! | `REFRESH_INTERVAL_MS` | Period of the background refresh run | `28800000` (8 h) |
//! | `SESSION_MAX_AGE_MS` | Last-login age that triggers an async login update | `86400000` (24 h) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::auth::proxy_pki::{
    DEFAULT_MASQUERADE_USER_HEADER, DEFAULT_PRIMARY_USER_HEADER, DEFAULT_PROXIED_USER_HEADER,
};

/// Environment variable name for the cache database directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

const DEFAULT_DATA_DIR: &str = "/data";
const DEFAULT_REFRESH_WINDOW_MS: u64 = 8 * 60 * 60 * 1000;
const DEFAULT_REFRESH_INTERVAL_MS: u64 = 8 * 60 * 60 * 1000;
const DEFAULT_SESSION_MAX_AGE_MS: u64 = 24 * 60 * 60 * 1000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Immutable runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub access_checker_url: Url,
    pub primary_user_header: String,
    pub proxied_user_header: String,
    pub masquerade_user_header: String,
    pub refresh_window: Duration,
    pub refresh_interval: Duration,
    pub session_max_age: Duration,
    /// `json` or `pretty`.
    pub log_format: String,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let access_checker_url = env::var("ACCESS_CHECKER_URL")
            .map_err(|_| ConfigError::Missing("ACCESS_CHECKER_URL"))?;
        let access_checker_url =
            Url::parse(&access_checker_url).map_err(|_| ConfigError::Invalid {
                name: "ACCESS_CHECKER_URL",
                value: access_checker_url,
            })?;

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 8080)?,
            data_dir: env::var(DATA_DIR_ENV)
                .unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string())
                .into(),
            access_checker_url,
            primary_user_header: env::var("PRIMARY_USER_HEADER")
                .unwrap_or_else(|_| DEFAULT_PRIMARY_USER_HEADER.to_string()),
            proxied_user_header: env::var("PROXIED_USER_HEADER")
                .unwrap_or_else(|_| DEFAULT_PROXIED_USER_HEADER.to_string()),
            masquerade_user_header: env::var("MASQUERADE_USER_HEADER")
                .unwrap_or_else(|_| DEFAULT_MASQUERADE_USER_HEADER.to_string()),
            refresh_window: Duration::from_millis(parse_var(
                "REFRESH_WINDOW_MS",
                DEFAULT_REFRESH_WINDOW_MS,
            )?),
            refresh_interval: Duration::from_millis(parse_var(
                "REFRESH_INTERVAL_MS",
                DEFAULT_REFRESH_INTERVAL_MS,
            )?),
            session_max_age: Duration::from_millis(parse_var(
                "SESSION_MAX_AGE_MS",
                DEFAULT_SESSION_MAX_AGE_MS,
            )?),
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
        })
    }

    /// Fixed configuration for tests; no environment access.
    #[cfg(test)]
    pub fn default_for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            data_dir: PathBuf::from("/tmp"),
            access_checker_url: Url::parse("http://checker.test/").unwrap(),
            primary_user_header: DEFAULT_PRIMARY_USER_HEADER.to_string(),
            proxied_user_header: DEFAULT_PROXIED_USER_HEADER.to_string(),
            masquerade_user_header: DEFAULT_MASQUERADE_USER_HEADER.to_string(),
            refresh_window: Duration::from_millis(DEFAULT_REFRESH_WINDOW_MS),
            refresh_interval: Duration::from_millis(DEFAULT_REFRESH_INTERVAL_MS),
            session_max_age: Duration::from_millis(DEFAULT_SESSION_MAX_AGE_MS),
            log_format: "pretty".to_string(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
            name,
            value,
        }),
        Err(_) => Ok(default),
    }
}
