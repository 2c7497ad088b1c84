//! Group registration handlers.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use caravan_core::types::{Group, GroupId, Its};
use caravan_core::Stores;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

/// Group registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterGroupRequest {
    /// Leader traveler.
    pub leader_its: i64,
    /// Member travelers.
    #[serde(default)]
    pub member_its: Vec<i64>,
}

/// `POST /api/register-group` — register a leader with members.
///
/// # Errors
///
/// 404 naming the first missing traveler, 400 when the leader is listed
/// among the members.
pub async fn register_group<S: Stores>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Json(body): Json<RegisterGroupRequest>,
) -> Result<(StatusCode, Json<Group>), AppError> {
    state.authenticate(&headers).await?;

    let leader = Its::new(body.leader_its)?;
    let members = body
        .member_its
        .iter()
        .map(|&its| Its::new(its))
        .collect::<caravan_core::Result<Vec<Its>>>()?;
    let group = state.groups().register(leader, &members).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// `GET /api/groups/:id` — fetch a group with its members.
///
/// # Errors
///
/// 404 for an unknown group.
pub async fn get_group<S: Stores>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Group>, AppError> {
    state.authenticate(&headers).await?;
    let group = state.groups().group(GroupId(id)).await?;
    Ok(Json(group))
}
