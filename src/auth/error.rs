// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
///
/// Every failure of the verification pipeline maps to exactly one variant;
/// callers can distinguish "who are you" failures (401) from "you can't do
/// that" failures (403) and from provider outages (503).
#[derive(Debug)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Authorization header present but not `Bearer <token>`
    InvalidAuthHeader,
    /// Token is malformed (segment count, encoding, header JSON)
    MalformedToken,
    /// Token header lacks a key id
    MissingKeyId,
    /// Token key id is not in the realm's key set
    UnknownKeyId,
    /// Token signature is invalid, or the header asserts a non-pinned algorithm
    InvalidSignature,
    /// Token has expired
    TokenExpired,
    /// Token is not yet valid
    TokenNotYetValid,
    /// Token claims lack a subject
    MissingSubject,
    /// JWKS fetch failed (provider unreachable, timeout, non-2xx)
    JwksFetch(String),
    /// JWKS body is not a valid key set
    JwksParse(String),
    /// Authenticated, but lacking the required role
    InsufficientRole,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the stable error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::MissingKeyId => "missing_key_id",
            AuthError::UnknownKeyId => "unknown_key_id",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::MissingSubject => "missing_subject",
            AuthError::JwksFetch(_) => "jwks_fetch_error",
            AuthError::JwksParse(_) => "jwks_parse_error",
            AuthError::InsufficientRole => "insufficient_role",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::MalformedToken
            | AuthError::MissingKeyId
            | AuthError::UnknownKeyId
            | AuthError::InvalidSignature
            | AuthError::TokenExpired
            | AuthError::TokenNotYetValid
            | AuthError::MissingSubject => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientRole => StatusCode::FORBIDDEN,
            AuthError::JwksFetch(_) | AuthError::JwksParse(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::MissingKeyId => write!(f, "Token missing key ID"),
            AuthError::UnknownKeyId => write!(f, "Invalid key ID in token"),
            AuthError::InvalidSignature => write!(f, "Token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenNotYetValid => write!(f, "Token is not yet valid"),
            AuthError::MissingSubject => write!(f, "Invalid token: missing subject"),
            AuthError::JwksFetch(msg) => write!(f, "Failed to fetch JWKS: {msg}"),
            AuthError::JwksParse(msg) => write!(f, "Failed to parse JWKS: {msg}"),
            AuthError::InsufficientRole => {
                write!(f, "Insufficient role for this operation")
            }
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
