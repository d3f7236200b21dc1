// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values, and the
//! [`Settings`] struct loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `KEYCLOAK_URL` | Keycloak base URL | `http://localhost:8080` |
//! | `KEYCLOAK_REALM` | Keycloak realm name | `CirclePortal-dev` |
//! | `KEYCLOAK_CLIENT_ID` | This backend's client id (scopes role extraction) | `circle-portal-backend` |
//! | `KEYCLOAK_ALGORITHM` | Pinned JWT signature algorithm | `RS256` |

use std::env;

use jsonwebtoken::Algorithm;

/// Environment variable name for the Keycloak base URL.
pub const KEYCLOAK_URL_ENV: &str = "KEYCLOAK_URL";

/// Environment variable name for the Keycloak realm.
pub const KEYCLOAK_REALM_ENV: &str = "KEYCLOAK_REALM";

/// Environment variable name for this backend's Keycloak client id.
pub const KEYCLOAK_CLIENT_ID_ENV: &str = "KEYCLOAK_CLIENT_ID";

/// Environment variable name for the pinned signature algorithm.
pub const KEYCLOAK_ALGORITHM_ENV: &str = "KEYCLOAK_ALGORITHM";

/// Application settings, loaded from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Keycloak base URL (e.g. `https://auth.example.edu`).
    pub keycloak_url: String,
    /// Keycloak realm name.
    pub keycloak_realm: String,
    /// This backend's own client id. Role extraction is scoped to it.
    pub keycloak_client_id: String,
    /// Pinned JWT signature algorithm. Tokens asserting any other algorithm
    /// are rejected regardless of their header.
    pub algorithm: Algorithm,
}

impl Settings {
    /// Load settings from the environment, falling back to dev defaults.
    pub fn from_env() -> Self {
        let algorithm = env::var(KEYCLOAK_ALGORITHM_ENV)
            .ok()
            .and_then(|s| parse_algorithm(&s))
            .unwrap_or(Algorithm::RS256);

        Self {
            keycloak_url: env::var(KEYCLOAK_URL_ENV)
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            keycloak_realm: env::var(KEYCLOAK_REALM_ENV)
                .unwrap_or_else(|_| "CirclePortal-dev".to_string()),
            keycloak_client_id: env::var(KEYCLOAK_CLIENT_ID_ENV)
                .unwrap_or_else(|_| "circle-portal-backend".to_string()),
            algorithm,
        }
    }

    /// The realm's JWKS endpoint (standard Keycloak layout).
    pub fn jwks_url(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/certs",
            self.keycloak_url.trim_end_matches('/'),
            self.keycloak_realm
        )
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            keycloak_url: "http://localhost:8080".to_string(),
            keycloak_realm: "CirclePortal-dev".to_string(),
            keycloak_client_id: "circle-portal-backend".to_string(),
            algorithm: Algorithm::RS256,
        }
    }
}

/// Parse an asymmetric signature algorithm name.
fn parse_algorithm(s: &str) -> Option<Algorithm> {
    match s {
        "RS256" => Some(Algorithm::RS256),
        "RS384" => Some(Algorithm::RS384),
        "RS512" => Some(Algorithm::RS512),
        "ES256" => Some(Algorithm::ES256),
        "ES384" => Some(Algorithm::ES384),
        _ => None,
    }
}
