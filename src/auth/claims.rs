// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Claims extracted from a Keycloak access token.
///
/// Keycloak tokens carry standard OIDC claims plus the `resource_access`
/// structure holding per-client role grants:
///
/// ```json
/// {
///   "sub": "f3b0...",
///   "email": "taro.yamada@edu.teu.ac.jp",
///   "resource_access": {
///     "circle-portal-backend": { "roles": ["system_admin"] }
///   }
/// }
/// ```
///
/// A value of this type exists only as the output of successful signature
/// verification; nothing constructs one from an unverified header.
#[derive(Debug, Clone, Deserialize)]
pub struct KeycloakClaims {
    /// Subject (user ID). Defaulted so an absent claim surfaces as the
    /// dedicated missing-subject failure instead of a deserialization error.
    #[serde(default)]
    pub sub: String,

    /// Email address (optional)
    #[serde(default)]
    pub email: Option<String>,

    /// Preferred username (optional)
    #[serde(default)]
    pub preferred_username: Option<String>,

    /// Expiration timestamp
    #[serde(default)]
    pub exp: i64,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: i64,

    /// Not before timestamp (optional)
    #[serde(default)]
    pub nbf: Option<i64>,

    /// Issuer (realm URL)
    #[serde(default)]
    pub iss: String,

    /// Per-client role grants
    #[serde(default)]
    pub resource_access: HashMap<String, ClientAccess>,
}

/// Role grants for one client inside `resource_access`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientAccess {
    /// Role codes granted to the subject for this client
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Authenticated user information extracted from a verified JWT.
///
/// This is the type handed to downstream authorization checks and business
/// logic to represent the caller.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    /// Canonical user ID (Keycloak `sub` claim)
    pub user_id: String,

    /// Email address, if the token carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Full verified claims, kept for role extraction
    #[serde(skip)]
    pub claims: KeycloakClaims,
}

impl AuthenticatedUser {
    /// Create from verified claims. The subject is guaranteed non-empty by
    /// the verifier before this runs.
    pub fn from_claims(claims: KeycloakClaims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            email: claims.email.clone(),
            claims,
        }
    }
}
