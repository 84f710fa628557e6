// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! External access-checker provider.
//!
//! The authoritative directory for identity attributes. The gateway only
//! talks to it through [`AccessProvider`]: a lookup on cache miss or forced
//! refresh, and a login-timestamp update when a delegated identity has not
//! been seen within the session window. Its latency directly affects
//! authentication latency on cache miss.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Outbound HTTP timeout for provider calls. Surfaces as a normalized
/// authentication failure when exceeded; no other timeout contract exists at
/// this layer.
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}")]
    Status { status: u16 },

    /// The provider rejected the subject with a structured denial. Passed
    /// through to the client unchanged.
    #[error("{message}")]
    Denied {
        status: u16,
        kind: String,
        message: String,
    },

    #[error("invalid provider URL: {0}")]
    Url(#[from] url::ParseError),
}

// =============================================================================
// Attribute Model
// =============================================================================

/// Authoritative attribute record for one subject, as returned by the
/// access-checker provider. This is what the cache stores as the entry value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AccessAttributes {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    /// Whether this subject may act on behalf of another (rights intersected).
    #[serde(default)]
    pub can_proxy: bool,
    /// Whether this subject may assume another identity's full rights.
    #[serde(default)]
    pub can_masquerade: bool,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

// =============================================================================
// Provider Trait
// =============================================================================

/// The external collaborator that owns identity attributes.
#[async_trait]
pub trait AccessProvider: Send + Sync {
    /// Fetch the authoritative attributes for a subject DN.
    async fn lookup(&self, dn: &str) -> Result<AccessAttributes, ProviderError>;

    /// Record that the subject authenticated just now.
    async fn record_login(&self, dn: &str) -> Result<(), ProviderError>;
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// Structured denial body some provider deployments return on 4xx.
#[derive(Debug, Deserialize)]
struct DenialBody {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

/// Access-checker provider over HTTP.
///
/// - `GET {base}/access?dn=<subject>` → `AccessAttributes`
/// - `POST {base}/login?dn=<subject>` → 2xx
pub struct HttpAccessProvider {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpAccessProvider {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            client: reqwest::Client::builder()
                .timeout(PROVIDER_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    fn endpoint(&self, path: &str, dn: &str) -> Result<Url, ProviderError> {
        let mut url = self.base_url.join(path)?;
        url.query_pairs_mut().append_pair("dn", dn);
        Ok(url)
    }
}

#[async_trait]
impl AccessProvider for HttpAccessProvider {
    async fn lookup(&self, dn: &str) -> Result<AccessAttributes, ProviderError> {
        let url = self.endpoint("access", dn)?;
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status.is_client_error() {
            // A structured denial body is preserved; anything else collapses
            // to the bare status.
            if let Ok(denial) = response.json::<DenialBody>().await {
                return Err(ProviderError::Denied {
                    status: status.as_u16(),
                    kind: denial.kind,
                    message: denial.message,
                });
            }
            return Err(ProviderError::Status {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
            });
        }

        Ok(response.json().await?)
    }

    async fn record_login(&self, dn: &str) -> Result<(), ProviderError> {
        let url = self.endpoint("login", dn)?;
        let response = self.client.post(url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_deserialize_with_defaults() {
        let attrs: AccessAttributes = serde_json::from_str(r#"{"roles": ["user"]}"#).unwrap();
        assert_eq!(attrs.roles, vec!["user".to_string()]);
        assert!(attrs.groups.is_empty());
        assert!(!attrs.can_proxy);
        assert!(!attrs.can_masquerade);
        assert!(attrs.last_login.is_none());
    }

    #[test]
    fn endpoint_encodes_dn_query() {
        let provider = HttpAccessProvider::new(Url::parse("https://checker.internal/").unwrap());
        let url = provider
            .endpoint("access", "cn=alice smith,ou=people,o=example")
            .unwrap();
        assert_eq!(url.path(), "/access");
        assert!(url.query().unwrap().contains("cn%3Dalice"));
    }
}
