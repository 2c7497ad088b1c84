//! Traveler intake, lookup, arrival, and SIM assignment handlers.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use caravan_core::import;
use caravan_core::stores::TravelerStore;
use caravan_core::types::{Designation, Its, NewTraveler, Traveler};
use caravan_core::Stores;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

/// Travelers returned per listing page.
const PAGE_SIZE: u32 = 10;

/// Manual intake request body. Dates are strings in any accepted intake
/// format.
#[derive(Debug, Deserialize)]
pub struct CreateTravelerRequest {
    /// Traveler identifier.
    pub its: i64,
    /// First name.
    pub first_name: String,
    /// Middle name.
    pub middle_name: Option<String>,
    /// Last name.
    pub last_name: String,
    /// Date of birth.
    pub date_of_birth: Option<String>,
    /// Passport number.
    pub passport_no: Option<String>,
    /// Passport expiry date.
    pub passport_expiry: Option<String>,
    /// Visa number.
    pub visa_no: Option<String>,
}

/// `POST /api/travelers` — manual traveler intake.
///
/// # Errors
///
/// 400 for invalid fields, 409 for a registered ITS or passport.
pub async fn create_traveler<S: Stores>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Json(body): Json<CreateTravelerRequest>,
) -> Result<(StatusCode, Json<Traveler>), AppError> {
    let session = state.authenticate(&headers).await?;
    session.require(&[Designation::Customs])?;

    let new = NewTraveler {
        its: Its::new(body.its)?,
        first_name: body.first_name,
        middle_name: body.middle_name,
        last_name: body.last_name,
        date_of_birth: parse_opt_date(body.date_of_birth.as_deref())?,
        passport_no: body.passport_no,
        passport_expiry: parse_opt_date(body.passport_expiry.as_deref())?,
        visa_no: body.visa_no,
    };
    let traveler = state.stores.create_traveler(&new).await?;
    tracing::info!(its = %traveler.its, by = %session.username, "traveler registered");
    Ok((StatusCode::CREATED, Json(traveler)))
}

fn parse_opt_date(raw: Option<&str>) -> Result<Option<chrono::NaiveDate>, AppError> {
    raw.map(import::parse_date).transpose().map_err(Into::into)
}

/// Import response body.
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    /// Number of travelers committed.
    pub imported: u64,
}

/// `POST /api/travelers/import` — CSV manifest intake, all-or-nothing.
///
/// # Errors
///
/// 400 naming the failing CSV line, 409 if any row collides with an
/// existing traveler.
pub async fn import_travelers<S: Stores>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<ImportResponse>), AppError> {
    let session = state.authenticate(&headers).await?;
    session.require(&[Designation::Customs])?;

    let rows = import::parse_manifest(&body)?;
    let imported = state.stores.import_travelers(&rows).await?;
    tracing::info!(imported, by = %session.username, "manifest imported");
    Ok((StatusCode::CREATED, Json(ImportResponse { imported })))
}

/// `GET /api/travelers/:its` — fetch one traveler.
///
/// # Errors
///
/// 404 when the ITS is unknown.
pub async fn get_traveler<S: Stores>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Path(its): Path<i64>,
) -> Result<Json<Traveler>, AppError> {
    state.authenticate(&headers).await?;
    let traveler = state.stores.traveler(Its::new(its)?).await?;
    Ok(Json(traveler))
}

/// Listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// 1-based page number; defaults to 1.
    pub page: Option<u32>,
}

/// One listing page.
#[derive(Debug, Serialize)]
pub struct TravelerPage {
    /// Travelers on this page, in ITS order.
    pub travelers: Vec<Traveler>,
    /// Total traveler count.
    pub total: u64,
    /// The page served.
    pub page: u32,
}

/// `GET /api/travelers?page=` — paginated listing, 10 per page.
///
/// # Errors
///
/// 500 if the store query fails.
pub async fn list_travelers<S: Stores>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<TravelerPage>, AppError> {
    state.authenticate(&headers).await?;
    let page = query.page.unwrap_or(1).max(1);
    let (travelers, total) = state.stores.travelers_page(page, PAGE_SIZE).await?;
    Ok(Json(TravelerPage {
        travelers,
        total,
        page,
    }))
}

/// Bulk-clear response body.
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    /// Number of traveler rows removed.
    pub removed: u64,
}

/// `DELETE /api/travelers` — administrative bulk-clear.
///
/// # Errors
///
/// 403 for non-admin callers.
pub async fn clear_travelers<S: Stores>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Json<ClearResponse>, AppError> {
    let session = state.authenticate(&headers).await?;
    session.require(&[])?;

    let removed = state.stores.clear().await?;
    tracing::warn!(removed, by = %session.username, "traveler data cleared");
    Ok(Json(ClearResponse { removed }))
}

/// `POST /api/travelers/:its/arrived` — mark a traveler as arrived.
///
/// # Errors
///
/// 404 when the ITS is unknown, 403 for roles other than arrival/admin.
pub async fn mark_arrived<S: Stores>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Path(its): Path<i64>,
) -> Result<Json<Traveler>, AppError> {
    let session = state.authenticate(&headers).await?;
    session.require(&[Designation::Arrival])?;

    let traveler = state.stores.mark_arrived(Its::new(its)?, Utc::now()).await?;
    tracing::info!(its = %traveler.its, by = %session.username, "traveler arrived");
    Ok(Json(traveler))
}

/// Arrival listing response body.
#[derive(Debug, Serialize)]
pub struct ArrivedResponse {
    /// Arrived travelers, most recent first.
    pub travelers: Vec<Traveler>,
    /// Arrived count.
    pub count: u64,
}

/// `GET /api/travelers/arrived` — arrived travelers, most recent first.
///
/// # Errors
///
/// 500 if the store query fails.
pub async fn list_arrived<S: Stores>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Json<ArrivedResponse>, AppError> {
    let session = state.authenticate(&headers).await?;
    session.require(&[Designation::Arrival])?;

    let travelers = state.stores.arrived().await?;
    let count = travelers.len() as u64;
    Ok(Json(ArrivedResponse { travelers, count }))
}

/// SIM assignment request body.
#[derive(Debug, Deserialize)]
pub struct AssignSimRequest {
    /// Phone number to assign.
    pub phone: String,
}

/// `POST /api/travelers/:its/sim` — assign a SIM phone number.
///
/// # Errors
///
/// 404 when the ITS is unknown, 409 when the phone is already assigned.
pub async fn assign_sim<S: Stores>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Path(its): Path<i64>,
    Json(body): Json<AssignSimRequest>,
) -> Result<Json<Traveler>, AppError> {
    let session = state.authenticate(&headers).await?;
    session.require(&[Designation::Customs])?;

    if body.phone.trim().is_empty() {
        return Err(AppError::bad_request("phone must not be empty"));
    }
    let traveler = state
        .stores
        .assign_phone(Its::new(its)?, body.phone.trim())
        .await?;
    tracing::info!(its = %traveler.its, by = %session.username, "SIM assigned");
    Ok(Json(traveler))
}
