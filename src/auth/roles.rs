// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client-scoped role extraction and role predicates.
//!
//! Pure functions over verified claims; no I/O. Role grants live under
//! `resource_access.{client_id}.roles` in the Keycloak token; absence at any
//! level is a legitimate "no roles" outcome, never an error.

use std::collections::HashSet;

use super::claims::KeycloakClaims;

/// Role code granting full administrative access over the portal.
pub const SYSTEM_ADMIN_ROLE: &str = "system_admin";

/// Extract the role codes granted to the subject for the given client.
///
/// Returns the empty set when the token has no `resource_access` entry for
/// the client.
pub fn client_roles(claims: &KeycloakClaims, client_id: &str) -> HashSet<String> {
    claims
        .resource_access
        .get(client_id)
        .map(|access| access.roles.iter().cloned().collect())
        .unwrap_or_default()
}

/// Check whether a role set carries the `system_admin` role.
pub fn is_system_admin(roles: &HashSet<String>) -> bool {
    has_role(roles, SYSTEM_ADMIN_ROLE)
}

/// Check whether a role set carries the given role code.
pub fn has_role(roles: &HashSet<String>, role: &str) -> bool {
    roles.contains(role)
}
