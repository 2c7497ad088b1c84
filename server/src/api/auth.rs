//! Login and logout handlers.

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use caravan_core::stores::UserStore;
use caravan_core::types::Designation;
use caravan_core::{Error, Stores};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::session::{bearer_token, generate_token, verify_password, Session, SessionStore};
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Operator username.
    pub username: String,
    /// Operator password.
    pub password: String,
}

/// Login response body.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// Role of the authenticated operator.
    pub designation: Designation,
}

/// `POST /auth/login` — exchange credentials for a bearer token.
///
/// # Errors
///
/// 401 for an unknown username or a wrong password; the two cases are not
/// distinguished in the response.
pub async fn login<S: Stores>(
    State(state): State<AppState<S>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = match state.stores.user(&body.username).await {
        Ok(user) => user,
        Err(Error::NotFound { .. }) => {
            return Err(AppError::unauthorized("invalid credentials"));
        }
        Err(other) => return Err(other.into()),
    };
    if !verify_password(&body.password, &user.password_hash) {
        return Err(AppError::unauthorized("invalid credentials"));
    }

    let token = generate_token();
    state
        .sessions
        .insert(
            &token,
            Session {
                username: user.username.clone(),
                designation: user.designation,
                created_at: Utc::now(),
            },
        )
        .await;
    tracing::info!(username = %user.username, designation = %user.designation, "operator logged in");

    Ok(Json(LoginResponse {
        token,
        designation: user.designation,
    }))
}

/// `POST /auth/logout` — revoke the presented session.
///
/// # Errors
///
/// 401 when no valid session is presented.
pub async fn logout<S: Stores>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let session = state.authenticate(&headers).await?;
    let token = bearer_token(&headers)?;
    state.sessions.revoke(token).await;
    tracing::info!(username = %session.username, "operator logged out");
    Ok(StatusCode::NO_CONTENT)
}
