//! Transport unit and booking store trait.

use crate::error::Result;
use crate::types::{Booking, BookingId, Its, NewUnit, TransportUnit, UnitId, UnitKind};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Store for transport units and seat bookings.
///
/// Seat numbers on a unit are unique (storage constraint) and the
/// remaining-seat counter never goes below zero. `try_allocate` is a
/// single attempt; the retry policy lives in [`crate::Allocator`].
pub trait BookingStore: Send + Sync {
    /// Register a new transport unit.
    ///
    /// Seated kinds receive the next unit number for that kind
    /// (`max(existing) + 1`, starting at 1) inside the same transaction.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Validation`] if kind-required attributes are
    ///   missing (capacity for seated kinds, company for carrier kinds)
    /// - [`crate::Error::Conflict`] if unit numbering races
    fn add_unit(&self, unit: &NewUnit) -> impl Future<Output = Result<TransportUnit>> + Send;

    /// Fetch a unit by id.
    ///
    /// # Errors
    ///
    /// [`crate::Error::NotFound`] if the unit does not exist.
    fn unit(&self, id: UnitId) -> impl Future<Output = Result<TransportUnit>> + Send;

    /// All units, optionally filtered by kind, in id order.
    ///
    /// # Errors
    ///
    /// Returns error if the storage query fails.
    fn units(
        &self,
        kind: Option<UnitKind>,
    ) -> impl Future<Output = Result<Vec<TransportUnit>>> + Send;

    /// One allocation attempt: book the traveler onto the unit.
    ///
    /// For seated kinds, within a single transaction: lock the unit row,
    /// check remaining seats, take the lowest unused seat number, insert
    /// the booking, and decrement the counter. Carrier kinds skip the
    /// seat/capacity steps.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::NotFound`] if the traveler or unit is missing
    /// - [`crate::Error::Full`] if no seats remain
    /// - [`crate::Error::Duplicate`] if the traveler already holds a
    ///   booking for this mode of transport
    /// - [`crate::Error::Conflict`] if a concurrent allocation won the
    ///   (unit, seat) constraint; the caller may retry
    fn try_allocate(
        &self,
        its: Its,
        unit_id: UnitId,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<Booking>> + Send;

    /// Delete a booking and release its seat, atomically.
    ///
    /// # Errors
    ///
    /// [`crate::Error::NotFound`] if the booking does not exist.
    fn cancel(&self, id: BookingId) -> impl Future<Output = Result<()>> + Send;

    /// Fetch a booking by id.
    ///
    /// # Errors
    ///
    /// [`crate::Error::NotFound`] if the booking does not exist.
    fn booking(&self, id: BookingId) -> impl Future<Output = Result<Booking>> + Send;

    /// All bookings held by a traveler, oldest first.
    ///
    /// # Errors
    ///
    /// [`crate::Error::NotFound`] if the traveler does not exist.
    fn bookings_for(&self, its: Its) -> impl Future<Output = Result<Vec<Booking>>> + Send;
}
