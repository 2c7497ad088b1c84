//! Transport unit handlers.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use caravan_core::types::{NewUnit, TransportUnit, UnitKind};
use caravan_core::Stores;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

/// Unit registration request body.
#[derive(Debug, Deserialize)]
pub struct CreateUnitRequest {
    /// Kind tag: `bus`, `train`, `plane`, or `shuttle`.
    pub kind: String,
    /// Scheduled departure.
    pub departure_time: Option<DateTime<Utc>>,
    /// Seat count; required for bus/shuttle.
    pub capacity: Option<i32>,
    /// Operating company; required for train/plane.
    pub company: Option<String>,
}

/// `POST /api/units` — register a transport unit (admin only).
///
/// # Errors
///
/// 400 for an unknown kind or missing kind-required attributes.
pub async fn create_unit<S: Stores>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Json(body): Json<CreateUnitRequest>,
) -> Result<(StatusCode, Json<TransportUnit>), AppError> {
    let session = state.authenticate(&headers).await?;
    session.require(&[])?;

    let unit = state
        .allocator()
        .add_unit(&NewUnit {
            kind: UnitKind::parse(&body.kind)?,
            departure_time: body.departure_time,
            capacity: body.capacity,
            company: body.company,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

/// Unit listing query parameters.
#[derive(Debug, Deserialize)]
pub struct UnitsQuery {
    /// Restrict to one kind.
    pub kind: Option<String>,
}

/// Unit listing response body.
#[derive(Debug, Serialize)]
pub struct UnitsResponse {
    /// Units in id order.
    pub units: Vec<TransportUnit>,
}

/// `GET /api/units?kind=` — list transport units.
///
/// # Errors
///
/// 400 for an unknown kind tag.
pub async fn list_units<S: Stores>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Query(query): Query<UnitsQuery>,
) -> Result<Json<UnitsResponse>, AppError> {
    state.authenticate(&headers).await?;

    let kind = query.kind.as_deref().map(UnitKind::parse).transpose()?;
    let units = state.allocator().units(kind).await?;
    Ok(Json(UnitsResponse { units }))
}
