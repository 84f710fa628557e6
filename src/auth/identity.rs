// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Resolved identity attached to authenticated requests.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::cache::AccessAttributes;

/// The acting identity for one request.
///
/// Groups and roles always reflect the authoritative provider attributes at
/// lookup time; nothing here is invented locally. Under proxy delegation the
/// sets are narrowed to the intersection with the primary identity's sets
/// before the identity is attached.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    /// Certificate subject DN.
    pub subject_dn: String,
    pub external_groups: HashSet<String>,
    pub external_roles: HashSet<String>,
    /// May act on behalf of another subject (rights intersected).
    pub can_proxy: bool,
    /// May assume another subject's full rights.
    pub can_masquerade: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identity {
    /// Build an identity from a provider attribute record.
    pub fn from_attributes(subject_dn: impl Into<String>, attrs: AccessAttributes) -> Self {
        Self {
            subject_dn: subject_dn.into(),
            external_groups: attrs.groups.into_iter().collect(),
            external_roles: attrs.roles.into_iter().collect(),
            can_proxy: attrs.can_proxy,
            can_masquerade: attrs.can_masquerade,
            last_login: attrs.last_login,
            username: attrs.username,
            display_name: attrs.display_name,
            organization: attrs.organization,
            email: attrs.email,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.external_roles.contains(role)
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.external_groups.contains(group)
    }

    /// Narrow this identity's rights to those also held by `other`.
    ///
    /// Used for proxy delegation: acting on behalf of someone never grants
    /// rights the acting party does not also hold.
    pub fn intersect_rights(&mut self, other: &Identity) {
        self.external_groups = self
            .external_groups
            .intersection(&other.external_groups)
            .cloned()
            .collect();
        self.external_roles = self
            .external_roles
            .intersection(&other.external_roles)
            .cloned()
            .collect();
    }
}

/// Which identity ended up attached to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DelegationOutcome {
    /// The certificate subject itself.
    Primary,
    /// A secondary identity with rights intersected against the primary's.
    Proxied,
    /// A secondary identity with its own full rights.
    Masqueraded,
}
