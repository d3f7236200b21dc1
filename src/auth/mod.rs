// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! This module provides Keycloak JWT authentication for the CirclePortal API.
//!
//! ## Auth Flow
//!
//! 1. Frontend authenticates the user against Keycloak
//! 2. Frontend sends `Authorization: Bearer <Keycloak JWT>`
//! 3. Backend:
//!    - Fetches the realm JWKS once and caches it for the process lifetime
//!    - Verifies JWT signature and time bounds against the pinned algorithm
//!    - Extracts:
//!      - `sub` → canonical `user_id`
//!      - `resource_access` → client-scoped roles
//!
//! ## Security
//!
//! - The verification algorithm is pinned by configuration; the token
//!   header's `alg` never selects it
//! - Tokens without a `kid`, or with a `kid` the realm does not publish,
//!   are rejected
//! - Clock skew tolerance is 60 seconds
//! - Audience verification is deliberately not enforced

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod roles;
pub mod verifier;

pub use claims::{AuthenticatedUser, KeycloakClaims};
pub use error::AuthError;
pub use extractor::{Auth, SystemAdmin};
pub use jwks::JwksCache;
pub use verifier::{RequestAuthenticator, TokenVerifier};
