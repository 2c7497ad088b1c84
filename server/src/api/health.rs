//! Health check endpoint.

use axum::Json;
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "ok" when the server answers.
    pub status: &'static str,
}

/// Liveness probe. No authentication.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
