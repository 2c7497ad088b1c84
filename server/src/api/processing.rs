//! Customs processing pipeline handlers.
//!
//! Every batch operation is scoped to the authenticated operator; one
//! operator can never see or flush another operator's pending records.

use axum::{extract::State, http::HeaderMap, Json};
use caravan_core::pipeline::ProcessRequest;
use caravan_core::types::{Designation, ProcessedRecord};
use caravan_core::Stores;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

/// Processing request body.
#[derive(Debug, Deserialize)]
pub struct ProcessBody {
    /// Traveler identifier.
    pub its: i64,
    /// Corrected first name.
    pub first_name: String,
    /// Corrected middle name.
    pub middle_name: Option<String>,
    /// Corrected last name.
    pub last_name: String,
    /// Passport number.
    pub passport_no: String,
    /// Passport expiry date.
    pub passport_expiry: String,
    /// Visa number.
    pub visa_no: Option<String>,
}

/// Processing response body.
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    /// The snapshot appended to the operator's batch.
    pub record: ProcessedRecord,
    /// Pending batch size after this record.
    pub pending_count: u64,
    /// Whether the batch has reached the flush threshold.
    pub should_flush: bool,
}

/// `POST /api/process` — process one traveler for the calling operator.
///
/// # Errors
///
/// 400 for invalid fields, 404 for an unknown traveler, 409 when this
/// operator already processed the traveler.
pub async fn process<S: Stores>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Json(body): Json<ProcessBody>,
) -> Result<Json<ProcessResponse>, AppError> {
    let session = state.authenticate(&headers).await?;
    session.require(&[Designation::Customs])?;

    let pipeline = state.pipeline();
    let record = pipeline
        .process(
            &session.username,
            ProcessRequest {
                its: body.its,
                first_name: body.first_name,
                middle_name: body.middle_name,
                last_name: body.last_name,
                passport_no: body.passport_no,
                passport_expiry: body.passport_expiry,
                visa_no: body.visa_no,
            },
        )
        .await?;
    let pending_count = pipeline.pending_count(&session.username).await?;
    let should_flush = pipeline.should_auto_flush(&session.username).await?;

    Ok(Json(ProcessResponse {
        record,
        pending_count,
        should_flush,
    }))
}

/// A pending or flushed batch.
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    /// Records in insertion order.
    pub records: Vec<ProcessedRecord>,
    /// Record count.
    pub count: u64,
}

/// `GET /api/pending-batch` — the calling operator's pending batch.
///
/// # Errors
///
/// 500 if the store query fails.
pub async fn pending_batch<S: Stores>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Json<BatchResponse>, AppError> {
    let session = state.authenticate(&headers).await?;
    session.require(&[Designation::Customs])?;

    let records = state.pipeline().pending(&session.username).await?;
    let count = records.len() as u64;
    Ok(Json(BatchResponse { records, count }))
}

/// `POST /api/flush-batch` — flush the calling operator's batch.
///
/// An empty batch flushes to an empty list, not an error.
///
/// # Errors
///
/// 500 if the store transaction fails.
pub async fn flush_batch<S: Stores>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Json<BatchResponse>, AppError> {
    let session = state.authenticate(&headers).await?;
    session.require(&[Designation::Customs])?;

    let records = state.pipeline().flush(&session.username).await?;
    let count = records.len() as u64;
    Ok(Json(BatchResponse { records, count }))
}
