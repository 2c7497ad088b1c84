//! Store traits: the seam between services and persistence.
//!
//! Each method is one semantic, atomic operation. Implementations wrap
//! multi-row updates in a transaction and map storage constraint
//! violations to [`crate::Error::Conflict`] (or [`crate::Error::Duplicate`]
//! where the constraint encodes a business rule).
//!
//! PostgreSQL implementations live in `caravan-postgres`; in-memory
//! implementations live in [`crate::memory`] behind the `test-utils`
//! feature.

mod bookings;
mod groups;
mod processing;
mod travelers;
mod users;

pub use bookings::BookingStore;
pub use groups::GroupStore;
pub use processing::ProcessingStore;
pub use travelers::TravelerStore;
pub use users::UserStore;

/// The full store surface the HTTP layer needs.
///
/// Implemented blanket-style so any one type providing every store trait
/// (e.g. `PostgresStores` or [`crate::MemoryStores`]) qualifies.
pub trait Stores:
    TravelerStore
    + ProcessingStore
    + BookingStore
    + GroupStore
    + UserStore
    + Clone
    + Send
    + Sync
    + 'static
{
}

impl<T> Stores for T where
    T: TravelerStore
        + ProcessingStore
        + BookingStore
        + GroupStore
        + UserStore
        + Clone
        + Send
        + Sync
        + 'static
{
}
