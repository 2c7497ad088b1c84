//! HTTP layer for the Caravan traveler logistics system.
//!
//! Thin axum surface over the services in `caravan-core`: bearer-token
//! sessions, role guards, JSON error mapping, and the router. The store
//! backend is a type parameter, so integration tests run the production
//! router against in-memory stores.

pub mod api;
pub mod config;
pub mod error;
pub mod routes;
pub mod session;
pub mod state;

pub use config::Config;
pub use error::AppError;
pub use routes::build_router;
pub use state::AppState;
