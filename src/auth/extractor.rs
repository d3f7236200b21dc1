// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication, and
//! `SystemAdmin` to additionally require the administrative role:
//!
//! ```rust,ignore
//! async fn create_circle(SystemAdmin(user): SystemAdmin) -> impl IntoResponse {
//!     // user is AuthenticatedUser, verified to hold system_admin
//! }
//! ```
//!
//! Both extractors are generic over the application state; the state only
//! needs to expose a [`RequestAuthenticator`] via `FromRef`.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{AuthenticatedUser, AuthError, RequestAuthenticator};

/// Extractor for authenticated users.
///
/// Validates the JWT from the Authorization header and provides the
/// authenticated user information. The header value is handed to
/// [`RequestAuthenticator::authenticate`] as a plain string; the core never
/// sees the request object.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
    RequestAuthenticator: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let authenticator = RequestAuthenticator::from_ref(state);

        let authorization = match parts.headers.get(AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| AuthError::InvalidAuthHeader)?),
            None => None,
        };

        let user = authenticator.authenticate(authorization).await?;
        Ok(Auth(user))
    }
}

/// Extractor that requires the `system_admin` role.
pub struct SystemAdmin(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for SystemAdmin
where
    S: Send + Sync,
    RequestAuthenticator: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        let authenticator = RequestAuthenticator::from_ref(state);
        authenticator.require_system_admin(&user)?;

        Ok(SystemAdmin(user))
    }
}
