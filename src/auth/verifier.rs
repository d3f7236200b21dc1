// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token verification and the request authentication entry point.
//!
//! [`TokenVerifier`] turns an opaque bearer string into verified
//! [`KeycloakClaims`] or a classified failure. [`RequestAuthenticator`] is
//! the boundary called once per privileged request: it takes the raw
//! `Authorization` header value and composes header parsing, verification,
//! and the claims-to-identity mapping.
//!
//! Per-request state machine, every arrow also terminal as a rejection:
//! header parsed → key resolved → signature checked → claims extracted →
//! authenticated. No retry happens inside; a rejected request is retried,
//! if at all, by the caller with a fresh token.

use jsonwebtoken::{decode, decode_header, Algorithm, Validation};

use super::claims::{AuthenticatedUser, KeycloakClaims};
use super::error::AuthError;
use super::jwks::JwksCache;
use super::roles;
use crate::config::Settings;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Verifies bearer tokens against the realm's published keys.
#[derive(Clone)]
pub struct TokenVerifier {
    /// Key cache for the realm
    jwks: JwksCache,
    /// Pinned signature algorithm; the token header never overrides it
    algorithm: Algorithm,
}

impl TokenVerifier {
    /// Create a verifier over the given key cache.
    pub fn new(jwks: JwksCache, algorithm: Algorithm) -> Self {
        Self { jwks, algorithm }
    }

    /// Verify a bearer token and return its claims.
    ///
    /// The audience claim is deliberately not verified; every other failure
    /// maps to a distinct [`AuthError`] variant.
    pub async fn verify(&self, token: &str) -> Result<KeycloakClaims, AuthError> {
        // Parse the header segment without signature checking. Nothing in it
        // is trusted beyond selecting a key candidate.
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;

        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;

        // Reject algorithm substitution before touching the network: a token
        // asserting anything but the pinned algorithm can never verify.
        if header.alg != self.algorithm {
            return Err(AuthError::InvalidSignature);
        }

        let decoding_key = self.jwks.decoding_key_for(&kid).await?;

        let mut validation = Validation::new(self.algorithm);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_nbf = true;
        validation.validate_aud = false;

        let token_data = decode::<KeycloakClaims>(token, &decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            })?;

        let claims = token_data.claims;
        if claims.sub.is_empty() {
            return Err(AuthError::MissingSubject);
        }

        Ok(claims)
    }
}

/// The authentication boundary consumed by the routing layer.
///
/// Given a raw `Authorization` header value, produces an authenticated
/// identity or a classified failure. Verifier failures propagate unchanged
/// so callers can log "malformed" apart from "expired" apart from "unknown
/// key", even though all of them surface as 401.
#[derive(Clone)]
pub struct RequestAuthenticator {
    verifier: TokenVerifier,
    client_id: String,
}

impl RequestAuthenticator {
    /// Create an authenticator from a verifier and this backend's client id.
    pub fn new(verifier: TokenVerifier, client_id: impl Into<String>) -> Self {
        Self {
            verifier,
            client_id: client_id.into(),
        }
    }

    /// Build the full verification stack from settings.
    pub fn from_settings(settings: &Settings) -> Self {
        let jwks = JwksCache::new(settings.jwks_url());
        Self::new(
            TokenVerifier::new(jwks, settings.algorithm),
            settings.keycloak_client_id.clone(),
        )
    }

    /// This backend's Keycloak client id.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Authenticate a request from its `Authorization` header value.
    pub async fn authenticate(
        &self,
        authorization: Option<&str>,
    ) -> Result<AuthenticatedUser, AuthError> {
        let header = authorization.ok_or(AuthError::MissingAuthHeader)?;

        // Case-sensitive prefix, single space.
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;

        let claims = self.verifier.verify(token).await.map_err(|e| {
            tracing::warn!(error = %e, error_code = e.error_code(), "Token rejected");
            e
        })?;

        Ok(AuthenticatedUser::from_claims(claims))
    }

    /// Require the `system_admin` role on this backend's client.
    ///
    /// Layered strictly after authentication: the failure is 403, distinct
    /// from every 401 the verifier produces.
    pub fn require_system_admin(&self, user: &AuthenticatedUser) -> Result<(), AuthError> {
        let granted = roles::client_roles(&user.claims, &self.client_id);
        if !roles::is_system_admin(&granted) {
            return Err(AuthError::InsufficientRole);
        }
        Ok(())
    }
}
