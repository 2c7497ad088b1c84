//! Operator account management (admin only).

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use caravan_core::stores::UserStore;
use caravan_core::types::{Designation, User};
use caravan_core::Stores;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::session::hash_password;
use crate::state::AppState;

/// Account creation request body.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// Login name.
    pub username: String,
    /// Initial password.
    pub password: String,
    /// Role tag: `admin`, `customs`, or `arrival`.
    pub designation: String,
}

/// Account representation without the credential hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// Login name.
    pub username: String,
    /// Role.
    pub designation: Designation,
}

/// `POST /api/users` — create an operator account.
///
/// # Errors
///
/// 403 for non-admin callers, 400 for an unknown designation tag, 409 for
/// a taken username.
pub async fn create_user<S: Stores>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let session = state.authenticate(&headers).await?;
    session.require(&[])?;

    let designation = Designation::parse(&body.designation)?;
    if body.username.trim().is_empty() {
        return Err(AppError::bad_request("username must not be empty"));
    }
    if body.password.is_empty() {
        return Err(AppError::bad_request("password must not be empty"));
    }
    let user = User {
        username: body.username,
        password_hash: hash_password(&body.password),
        designation,
    };
    let created = state.stores.create_user(&user).await?;
    tracing::info!(
        username = %created.username,
        designation = %created.designation,
        created_by = %session.username,
        "operator account created"
    );

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            username: created.username,
            designation: created.designation,
        }),
    ))
}
