// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end verification flows against a stubbed Keycloak JWKS endpoint.

mod common;

use chrono::Utc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use circle_portal_auth::auth::{roles, AuthError, JwksCache, RequestAuthenticator};
use common::*;

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn admin_token_authenticates_end_to_end() {
    let server = MockServer::start().await;
    mount_jwks(&server, &["k1"], 1).await;

    let authenticator = RequestAuthenticator::from_settings(&settings_for(&server));
    let token = sign_token("k1", &admin_claims("u1"));

    let user = authenticator
        .authenticate(Some(&bearer(&token)))
        .await
        .expect("valid admin token should authenticate");

    assert_eq!(user.user_id, "u1");
    assert_eq!(user.email.as_deref(), Some("u1@edu.teu.ac.jp"));

    let granted = roles::client_roles(&user.claims, authenticator.client_id());
    assert!(roles::is_system_admin(&granted));
}

#[tokio::test]
async fn repeated_verification_hits_the_cache() {
    let server = MockServer::start().await;
    mount_jwks(&server, &["k1"], 1).await;

    let authenticator = RequestAuthenticator::from_settings(&settings_for(&server));

    for i in 0..5 {
        let token = sign_token("k1", &admin_claims(&format!("u{i}")));
        let user = authenticator
            .authenticate(Some(&bearer(&token)))
            .await
            .unwrap();
        assert_eq!(user.user_id, format!("u{i}"));
    }
    // mount_jwks expects exactly one fetch; MockServer verifies on drop.
}

// ============================================================================
// Credential failures
// ============================================================================

#[tokio::test]
async fn missing_header_is_rejected() {
    let server = MockServer::start().await;
    let authenticator = RequestAuthenticator::from_settings(&settings_for(&server));

    let result = authenticator.authenticate(None).await;
    assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
}

#[tokio::test]
async fn bogus_token_is_malformed() {
    let server = MockServer::start().await;
    let authenticator = RequestAuthenticator::from_settings(&settings_for(&server));

    let result = authenticator
        .authenticate(Some("Bearer bogus.token.value"))
        .await;
    assert!(matches!(result, Err(AuthError::MalformedToken)));
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let server = MockServer::start().await;
    mount_jwks(&server, &["k1"], 1).await;

    let authenticator = RequestAuthenticator::from_settings(&settings_for(&server));

    let mut claims = admin_claims("u1");
    claims["exp"] = serde_json::json!(Utc::now().timestamp() - 7200);
    let token = sign_token("k1", &claims);

    let result = authenticator.authenticate(Some(&bearer(&token))).await;
    assert!(matches!(result, Err(AuthError::TokenExpired)));
}

#[tokio::test]
async fn token_used_before_nbf_is_rejected() {
    let server = MockServer::start().await;
    mount_jwks(&server, &["k1"], 1).await;

    let authenticator = RequestAuthenticator::from_settings(&settings_for(&server));

    let mut claims = admin_claims("u1");
    claims["exp"] = serde_json::json!(Utc::now().timestamp() + 7200);
    claims["nbf"] = serde_json::json!(Utc::now().timestamp() + 3600);
    let token = sign_token("k1", &claims);

    let result = authenticator.authenticate(Some(&bearer(&token))).await;
    assert!(matches!(result, Err(AuthError::TokenNotYetValid)));
}

#[tokio::test]
async fn signature_from_unrelated_key_is_rejected() {
    let server = MockServer::start().await;
    mount_jwks(&server, &["k1"], 1).await;

    let authenticator = RequestAuthenticator::from_settings(&settings_for(&server));

    // Correct kid, wrong private key: the published key must refuse it.
    let token = sign_token_with("k1", &admin_claims("u1"), UNRELATED_RSA_PRIVATE_KEY);

    let result = authenticator.authenticate(Some(&bearer(&token))).await;
    assert!(matches!(result, Err(AuthError::InvalidSignature)));
}

#[tokio::test]
async fn token_without_subject_is_rejected() {
    let server = MockServer::start().await;
    mount_jwks(&server, &["k1"], 1).await;

    let authenticator = RequestAuthenticator::from_settings(&settings_for(&server));

    let claims = serde_json::json!({
        "email": "ghost@edu.teu.ac.jp",
        "exp": Utc::now().timestamp() + 3600,
    });
    let token = sign_token("k1", &claims);

    let result = authenticator.authenticate(Some(&bearer(&token))).await;
    assert!(matches!(result, Err(AuthError::MissingSubject)));
}

#[tokio::test]
async fn asserted_algorithm_is_ignored_without_key_fetch() {
    // No mock is mounted: if the verifier consulted the provider for this
    // token the failure would surface as JwksFetch, not InvalidSignature.
    let server = MockServer::start().await;
    let authenticator = RequestAuthenticator::from_settings(&settings_for(&server));

    let mut header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256);
    header.kid = Some("k1".to_string());
    let token = jsonwebtoken::encode(
        &header,
        &admin_claims("u1"),
        &jsonwebtoken::EncodingKey::from_secret(b"guessable"),
    )
    .unwrap();

    let result = authenticator.authenticate(Some(&bearer(&token))).await;
    assert!(matches!(result, Err(AuthError::InvalidSignature)));
}

// ============================================================================
// Key rotation
// ============================================================================

#[tokio::test]
async fn unknown_kid_forces_exactly_one_refresh() {
    let server = MockServer::start().await;
    mount_jwks(&server, &["k1"], 2).await;

    let authenticator = RequestAuthenticator::from_settings(&settings_for(&server));

    // Populate the cache with k1.
    let token = sign_token("k1", &admin_claims("u1"));
    authenticator
        .authenticate(Some(&bearer(&token)))
        .await
        .unwrap();

    // k2 is never published: one forced refresh, then a hard failure.
    let token = sign_token("k2", &admin_claims("u2"));
    let result = authenticator.authenticate(Some(&bearer(&token))).await;
    assert!(matches!(result, Err(AuthError::UnknownKeyId)));
}

#[tokio::test]
async fn rotated_key_is_picked_up_on_refresh() {
    let server = MockServer::start().await;

    // The realm serves k1 once, then rotates to k2.
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body(&["k1"])))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body(&["k2"])))
        .expect(1)
        .mount(&server)
        .await;

    let authenticator = RequestAuthenticator::from_settings(&settings_for(&server));

    let token = sign_token("k1", &admin_claims("u1"));
    authenticator
        .authenticate(Some(&bearer(&token)))
        .await
        .unwrap();

    let token = sign_token("k2", &admin_claims("u2"));
    let user = authenticator
        .authenticate(Some(&bearer(&token)))
        .await
        .expect("token signed by the rotated key should verify after refresh");
    assert_eq!(user.user_id, "u2");
}

// ============================================================================
// Provider failures
// ============================================================================

#[tokio::test]
async fn provider_error_is_transient_and_not_cached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body(&["k1"])))
        .expect(1)
        .mount(&server)
        .await;

    let authenticator = RequestAuthenticator::from_settings(&settings_for(&server));
    let token = sign_token("k1", &admin_claims("u1"));

    let result = authenticator.authenticate(Some(&bearer(&token))).await;
    assert!(matches!(result, Err(AuthError::JwksFetch(_))));

    // The failure was not cached; the next request retries and succeeds.
    let user = authenticator
        .authenticate(Some(&bearer(&token)))
        .await
        .unwrap();
    assert_eq!(user.user_id, "u1");
}

#[tokio::test]
async fn non_key_set_body_is_a_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Service Temporarily Unavailable</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let authenticator = RequestAuthenticator::from_settings(&settings_for(&server));
    let token = sign_token("k1", &admin_claims("u1"));

    let result = authenticator.authenticate(Some(&bearer(&token))).await;
    assert!(matches!(result, Err(AuthError::JwksParse(_))));
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn concurrent_first_calls_share_one_fetch() {
    let server = MockServer::start().await;

    // The artificial delay widens the window in which callers race.
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(jwks_body(&["k1"]))
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cache = JwksCache::new(format!("{}{}", server.uri(), JWKS_PATH));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_keys().await })
        })
        .collect();

    for handle in handles {
        let jwks = handle.await.unwrap().expect("every waiter shares the fetch");
        assert_eq!(jwks.keys.len(), 1);
    }
}
