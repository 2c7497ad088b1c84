//! HTTP handlers, grouped by resource.

pub mod auth;
pub mod bookings;
pub mod groups;
pub mod health;
pub mod processing;
pub mod travelers;
pub mod units;
pub mod users;
