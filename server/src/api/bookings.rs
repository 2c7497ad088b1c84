//! Seat allocation and cancellation handlers.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use caravan_core::types::{Booking, BookingId, Its, UnitId};
use caravan_core::Stores;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

/// Allocation request body.
#[derive(Debug, Deserialize)]
pub struct AllocateRequest {
    /// Traveler to book.
    pub its: i64,
    /// Unit to book onto.
    pub unit_id: i64,
}

/// `POST /api/allocate-seat` — book a traveler onto a unit.
///
/// # Errors
///
/// 404 for an unknown traveler or unit, 409 when the unit is full or the
/// traveler already holds a booking for this mode.
pub async fn allocate_seat<S: Stores>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Json(body): Json<AllocateRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    state.authenticate(&headers).await?;

    let booking = state
        .allocator()
        .allocate(Its::new(body.its)?, UnitId(body.unit_id))
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// Cancellation request body.
#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    /// Booking to cancel.
    pub booking_id: i64,
}

/// `POST /api/cancel-seat` — cancel a booking, releasing its seat.
///
/// # Errors
///
/// 404 for an unknown booking.
pub async fn cancel_seat<S: Stores>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Json(body): Json<CancelRequest>,
) -> Result<StatusCode, AppError> {
    state.authenticate(&headers).await?;

    state.allocator().cancel(BookingId(body.booking_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Departure-check response body.
#[derive(Debug, Serialize)]
pub struct TravelerBookings {
    /// Bookings the traveler holds, oldest first.
    pub bookings: Vec<Booking>,
}

/// `GET /api/travelers/:its/bookings` — departure verification: the
/// bookings a traveler holds across all transport modes.
///
/// # Errors
///
/// 404 for an unknown traveler.
pub async fn traveler_bookings<S: Stores>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Path(its): Path<i64>,
) -> Result<Json<TravelerBookings>, AppError> {
    state.authenticate(&headers).await?;

    let bookings = state.allocator().bookings_for(Its::new(its)?).await?;
    Ok(Json(TravelerBookings { bookings }))
}
