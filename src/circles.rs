// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Privileged circle workflows.
//!
//! Creating a circle is the portal's one privileged write path: only a
//! `system_admin` may do it. The workflow layers authentication, the role
//! check, leader resolution, and the write in that order, and keeps each
//! failure class distinct for the routing layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::{AuthError, RequestAuthenticator};
use crate::directory::{CircleDirectory, DirectoryError, NewCircle};

/// Response payload for a successfully created circle.
#[derive(Debug, Serialize)]
pub struct CircleCreated {
    /// Id of the new circle
    pub circle_id: Uuid,
    /// Circle name
    pub name: String,
    /// Email of the registered leader
    pub leader_email: String,
    /// Human-readable confirmation
    pub message: String,
}

/// Failure of the create-circle workflow.
#[derive(Debug, Error)]
pub enum CircleError {
    /// Authentication or authorization failed
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// No user exists with the requested leader email
    #[error("user not found: {0}")]
    LeaderNotFound(String),
    /// The resource layer failed
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

#[derive(Serialize)]
struct CircleErrorBody {
    error: String,
}

impl IntoResponse for CircleError {
    fn into_response(self) -> Response {
        match self {
            CircleError::Auth(e) => e.into_response(),
            CircleError::LeaderNotFound(_) => {
                let body = Json(CircleErrorBody {
                    error: self.to_string(),
                });
                (StatusCode::NOT_FOUND, body).into_response()
            }
            CircleError::Directory(_) => {
                let body = Json(CircleErrorBody {
                    error: self.to_string(),
                });
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

/// Create a new circle. System admin only.
///
/// Flow:
/// 1. Verify the JWT from the `Authorization` header value
/// 2. Require the `system_admin` role on this backend's client
/// 3. Resolve the leader by email (404 if absent)
/// 4. Create the circle, unpublished, with the leader registered
pub async fn create_circle<D: CircleDirectory>(
    authenticator: &RequestAuthenticator,
    directory: &D,
    authorization: Option<&str>,
    request: NewCircle,
) -> Result<CircleCreated, CircleError> {
    let user = authenticator.authenticate(authorization).await?;
    authenticator.require_system_admin(&user)?;

    tracing::debug!(user_id = %user.user_id, circle = %request.name, "Creating circle");
    insert_with_leader(directory, request).await
}

/// Resolve the leader and create the record. Runs strictly after the role
/// check in [`create_circle`].
async fn insert_with_leader<D: CircleDirectory>(
    directory: &D,
    request: NewCircle,
) -> Result<CircleCreated, CircleError> {
    let leader = directory
        .find_user_by_email(&request.leader_email)
        .await?
        .ok_or_else(|| CircleError::LeaderNotFound(request.leader_email.clone()))?;

    let record = directory.create_circle(&request, &leader).await?;

    tracing::info!(
        circle_id = %record.id,
        leader_id = %leader.id,
        "Circle created"
    );

    Ok(CircleCreated {
        circle_id: record.id,
        name: record.name,
        leader_email: leader.email,
        message: "Circle created successfully".to_string(),
    })
}
