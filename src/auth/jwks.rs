// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! The realm's public keys are fetched once, on the first verification that
//! misses the cache, and kept for the lifetime of the process. Keys rotate
//! rarely; the staleness window this opens is bounded by the forced refresh
//! in [`JwksCache::decoding_key_for`], which re-fetches exactly once when a
//! token presents a key id the cached set does not contain.
//!
//! Concurrent first calls are single-flighted: one fetch runs, every caller
//! shares its result.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet};
use jsonwebtoken::DecodingKey;
use tokio::sync::{Mutex, RwLock};

use super::error::AuthError;

/// Timeout for the JWKS fetch.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// JWKS cache for one Keycloak realm.
///
/// Owns the single in-process copy of the realm's signing keys.
#[derive(Clone)]
pub struct JwksCache {
    /// JWKS URL (realm certs endpoint)
    jwks_url: String,
    /// Cached key set; `None` until first populated
    cache: Arc<RwLock<Option<Arc<JwkSet>>>>,
    /// Serializes the fetch-and-store step
    fetch_lock: Arc<Mutex<()>>,
    /// HTTP client
    client: reqwest::Client,
}

impl JwksCache {
    /// Create a new JWKS cache.
    ///
    /// # Arguments
    /// - `jwks_url`: The realm certs endpoint (e.g.
    ///   `https://auth.example.edu/realms/CirclePortal/protocol/openid-connect/certs`)
    pub fn new(jwks_url: impl Into<String>) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            cache: Arc::new(RwLock::new(None)),
            fetch_lock: Arc::new(Mutex::new(())),
            client: reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Get the JWKS URL.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Get the cached key set, fetching it on first use.
    ///
    /// Callers racing on an empty cache are serialized behind the fetch lock;
    /// exactly one fetch reaches the provider and every waiter reuses its
    /// result. A failed fetch is not cached, so the next call retries.
    pub async fn get_keys(&self) -> Result<Arc<JwkSet>, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(jwks) = &*cache {
                return Ok(Arc::clone(jwks));
            }
        }

        let _guard = self.fetch_lock.lock().await;

        // A concurrent caller may have populated the cache while this one
        // waited on the lock.
        {
            let cache = self.cache.read().await;
            if let Some(jwks) = &*cache {
                return Ok(Arc::clone(jwks));
            }
        }

        self.fetch_and_store().await
    }

    /// Force a re-fetch, replacing the cached key set.
    pub async fn refresh(&self) -> Result<Arc<JwkSet>, AuthError> {
        let _guard = self.fetch_lock.lock().await;
        self.fetch_and_store().await
    }

    /// Check whether the key set is currently cached.
    pub async fn is_cached(&self) -> bool {
        self.cache.read().await.is_some()
    }

    /// Get a decoding key for the given key ID.
    ///
    /// A miss against an already-populated cache triggers exactly one forced
    /// refresh before failing: a token signed by a freshly rotated key is
    /// indistinguishable from a forged `kid` until the provider is asked
    /// again.
    pub async fn decoding_key_for(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        let jwks = self.get_keys().await?;
        if let Some(jwk) = find_key(&jwks, kid) {
            return jwk_to_decoding_key(jwk);
        }

        tracing::warn!(kid, "Key ID not in cached JWKS, forcing one refresh");
        let jwks = self.refresh().await?;
        match find_key(&jwks, kid) {
            Some(jwk) => jwk_to_decoding_key(jwk),
            None => Err(AuthError::UnknownKeyId),
        }
    }

    /// Fetch the key set and store it in the cache.
    ///
    /// The fetch runs on its own task: a caller that gives up waiting (the
    /// surrounding request is cancelled) must not abort a fetch other
    /// waiters depend on.
    async fn fetch_and_store(&self) -> Result<Arc<JwkSet>, AuthError> {
        let this = self.clone();
        let handle = tokio::spawn(async move {
            let jwks = Arc::new(this.fetch_jwks().await?);
            *this.cache.write().await = Some(Arc::clone(&jwks));
            tracing::debug!(keys = jwks.keys.len(), "JWKS cache populated");
            Ok::<_, AuthError>(jwks)
        });

        handle
            .await
            .map_err(|e| AuthError::JwksFetch(e.to_string()))?
    }

    /// Fetch the key set from the endpoint.
    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::JwksFetch(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AuthError::JwksFetch(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| AuthError::JwksParse(e.to_string()))
    }
}

/// Find the key with the matching key id.
fn find_key<'a>(jwks: &'a JwkSet, kid: &str) -> Option<&'a Jwk> {
    jwks.keys
        .iter()
        .find(|k| k.common.key_id.as_deref() == Some(kid))
}

/// Convert a JWK to a DecodingKey.
///
/// Only the key material is taken from the JWK. The verification algorithm
/// is pinned by configuration and never derived from the key or the token
/// header.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<DecodingKey, AuthError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
            .map_err(|e| AuthError::JwksParse(format!("invalid RSA key material: {e}"))),
        AlgorithmParameters::EllipticCurve(ec) => DecodingKey::from_ec_components(&ec.x, &ec.y)
            .map_err(|e| AuthError::JwksParse(format!("invalid EC key material: {e}"))),
        _ => Err(AuthError::JwksParse(
            "unsupported key type in JWKS".to_string(),
        )),
    }
}
