// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Resource-layer collaborator interface.
//!
//! The auth core does not own persistence. The routing layer wires in an
//! implementation of [`CircleDirectory`] backed by the portal's relational
//! store; this module only fixes the seam the privileged workflows need:
//! resolving a user by email and creating a circle record.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Circle category, as stored by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CircleCategory {
    /// Sports clubs
    Sports,
    /// Cultural clubs
    Culture,
    /// Committees
    Committee,
}

impl std::fmt::Display for CircleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircleCategory::Sports => write!(f, "sports"),
            CircleCategory::Culture => write!(f, "culture"),
            CircleCategory::Committee => write!(f, "committee"),
        }
    }
}

/// A user row as the resource layer exposes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// User unique identifier
    pub id: Uuid,
    /// Display username
    pub username: String,
    /// Email address (unique within the portal)
    pub email: String,
}

/// Request payload for creating a circle.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCircle {
    /// Circle name
    pub name: String,
    /// Campus id (1 = Hachioji, 2 = Kamata)
    pub campus_id: i32,
    /// Circle category
    pub category: CircleCategory,
    /// Email of the user who will lead the circle
    pub leader_email: String,
}

/// A circle row as the resource layer exposes it.
///
/// Newly created circles start unpublished; a separate review step flips
/// `is_published`.
#[derive(Debug, Clone, Serialize)]
pub struct CircleRecord {
    /// Circle unique identifier
    pub id: Uuid,
    /// Circle name
    pub name: String,
    /// Campus id
    pub campus_id: i32,
    /// Circle category
    pub category: CircleCategory,
    /// Whether the circle is visible in the public listing
    pub is_published: bool,
    /// When the circle was created
    pub created_at: DateTime<Utc>,
}

/// Resource-layer failure.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The backing store could not be reached
    #[error("directory unavailable: {0}")]
    Unavailable(String),
    /// The write violated a storage constraint
    #[error("directory constraint violated: {0}")]
    Conflict(String),
}

/// Operations the privileged workflows need from the resource layer.
pub trait CircleDirectory: Send + Sync {
    /// Look up a user by email. `Ok(None)` means no such user.
    fn find_user_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, DirectoryError>> + Send;

    /// Create a circle led by the given user. The record starts unpublished
    /// and the leader is registered as the circle's first member.
    fn create_circle(
        &self,
        request: &NewCircle,
        leader: &UserRecord,
    ) -> impl Future<Output = Result<CircleRecord, DirectoryError>> + Send;
}
