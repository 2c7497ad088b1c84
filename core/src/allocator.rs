//! Capacity-bounded seat allocation for transport units.
//!
//! Seated kinds (bus, shuttle) issue dense seat numbers from 1 and track a
//! remaining-seat counter; carrier kinds (train, plane) record the booking
//! without seat accounting. A single attempt can lose a constraint race
//! under concurrency, so the allocator retries a bounded number of times
//! before surfacing the conflict.

use chrono::Utc;

use crate::error::{Error, Result};
use crate::stores::BookingStore;
use crate::types::{Booking, BookingId, Its, NewUnit, TransportUnit, UnitId, UnitKind};

/// Allocation attempts before a lost race is reported to the caller.
pub const MAX_ALLOCATION_ATTEMPTS: u32 = 3;

/// Lowest positive seat number absent from `taken`.
///
/// Seats freed by cancellation are reissued before any higher number.
#[must_use]
pub fn lowest_free_seat(taken: &[i32]) -> i32 {
    let mut sorted: Vec<i32> = taken.iter().copied().filter(|s| *s >= 1).collect();
    sorted.sort_unstable();
    sorted.dedup();
    let mut seat = 1;
    for occupied in sorted {
        if occupied != seat {
            break;
        }
        seat += 1;
    }
    seat
}

/// The booking service: unit registration plus retrying seat allocation
/// over a [`BookingStore`].
#[derive(Clone, Debug)]
pub struct Allocator<S> {
    store: S,
    max_attempts: u32,
}

impl<S: BookingStore> Allocator<S> {
    /// Build an allocator with the default retry bound.
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_attempts: MAX_ALLOCATION_ATTEMPTS,
        }
    }

    /// Validate and register a new transport unit.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if kind-required attributes are missing or
    /// non-positive; storage errors propagate from the store.
    pub async fn add_unit(&self, unit: &NewUnit) -> Result<TransportUnit> {
        if unit.kind.is_seated() {
            match unit.capacity {
                Some(capacity) if capacity > 0 => {}
                Some(capacity) => {
                    return Err(Error::Validation(format!(
                        "capacity must be positive, got {capacity}"
                    )));
                }
                None => {
                    return Err(Error::Validation(format!(
                        "{} units require a capacity",
                        unit.kind
                    )));
                }
            }
        } else if unit.company.as_deref().is_none_or(|c| c.trim().is_empty()) {
            return Err(Error::Validation(format!(
                "{} units require an operating company",
                unit.kind
            )));
        }

        let created = self.store.add_unit(unit).await?;
        tracing::info!(unit = %created.id, kind = %created.kind, "registered transport unit");
        Ok(created)
    }

    /// Fetch a unit by id.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the unit does not exist.
    pub async fn unit(&self, id: UnitId) -> Result<TransportUnit> {
        self.store.unit(id).await
    }

    /// All units, optionally filtered by kind.
    ///
    /// # Errors
    ///
    /// Returns error if the storage query fails.
    pub async fn units(&self, kind: Option<UnitKind>) -> Result<Vec<TransportUnit>> {
        self.store.units(kind).await
    }

    /// Book a traveler onto a unit, retrying lost races.
    ///
    /// Retries only on [`Error::Conflict`]; every other outcome is final
    /// on the first attempt.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the traveler or unit is missing
    /// - [`Error::Full`] if no seats remain
    /// - [`Error::Duplicate`] if the traveler already holds a booking for
    ///   this mode of transport
    /// - [`Error::Conflict`] if every attempt lost its race
    pub async fn allocate(&self, its: Its, unit_id: UnitId) -> Result<Booking> {
        let mut last = Error::Conflict("seat allocation contention".into());
        for attempt in 1..=self.max_attempts {
            match self.store.try_allocate(its, unit_id, Utc::now()).await {
                Ok(booking) => {
                    tracing::info!(
                        its = %its,
                        unit = %unit_id,
                        seat = booking.seat,
                        "allocated booking"
                    );
                    return Ok(booking);
                }
                Err(err) if err.is_conflict() => {
                    tracing::warn!(
                        its = %its,
                        unit = %unit_id,
                        attempt,
                        "allocation attempt lost a race"
                    );
                    last = err;
                }
                Err(err) => return Err(err),
            }
        }
        Err(last)
    }

    /// Cancel a booking, releasing its seat for reuse.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the booking does not exist.
    pub async fn cancel(&self, id: BookingId) -> Result<()> {
        self.store.cancel(id).await?;
        tracing::info!(booking = %id, "cancelled booking");
        Ok(())
    }

    /// Fetch a booking by id.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the booking does not exist.
    pub async fn booking(&self, id: BookingId) -> Result<Booking> {
        self.store.booking(id).await
    }

    /// All bookings a traveler holds, for checking them out at departure.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the traveler does not exist.
    pub async fn bookings_for(&self, its: Its) -> Result<Vec<Booking>> {
        self.store.bookings_for(its).await
    }
}
