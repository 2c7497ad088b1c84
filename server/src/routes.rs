//! Router configuration.
//!
//! Builds the complete Axum router. Generic over the store backend so the
//! same router serves PostgreSQL in production and in-memory stores in
//! tests.

use axum::{
    routing::{get, post},
    Router,
};
use caravan_core::Stores;
use tower_http::trace::TraceLayer;

use crate::api::{auth, bookings, groups, health, processing, travelers, units, users};
use crate::state::AppState;

/// Build the complete Axum router.
pub fn build_router<S: Stores>(state: AppState<S>) -> Router {
    let api_routes = Router::new()
        // Operator accounts
        .route("/users", post(users::create_user::<S>))
        // Traveler intake and lookup
        .route(
            "/travelers",
            post(travelers::create_traveler::<S>)
                .get(travelers::list_travelers::<S>)
                .delete(travelers::clear_travelers::<S>),
        )
        .route("/travelers/import", post(travelers::import_travelers::<S>))
        .route("/travelers/arrived", get(travelers::list_arrived::<S>))
        .route("/travelers/:its", get(travelers::get_traveler::<S>))
        .route("/travelers/:its/arrived", post(travelers::mark_arrived::<S>))
        .route("/travelers/:its/sim", post(travelers::assign_sim::<S>))
        .route(
            "/travelers/:its/bookings",
            get(bookings::traveler_bookings::<S>),
        )
        // Customs processing pipeline
        .route("/process", post(processing::process::<S>))
        .route("/pending-batch", get(processing::pending_batch::<S>))
        .route("/flush-batch", post(processing::flush_batch::<S>))
        // Transport and bookings
        .route(
            "/units",
            post(units::create_unit::<S>).get(units::list_units::<S>),
        )
        .route("/allocate-seat", post(bookings::allocate_seat::<S>))
        .route("/cancel-seat", post(bookings::cancel_seat::<S>))
        // Groups
        .route("/register-group", post(groups::register_group::<S>))
        .route("/groups/:id", get(groups::get_group::<S>));

    Router::new()
        // Health check (no authentication)
        .route("/health", get(health::health))
        // Authentication
        .route("/auth/login", post(auth::login::<S>))
        .route("/auth/logout", post(auth::logout::<S>))
        // API routes under /api prefix
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
