//! Traveler record store trait.

use crate::error::Result;
use crate::types::{Its, NewTraveler, Traveler};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Traveler record store.
///
/// Travelers are created by CSV import or manual entry and are never
/// deleted except through the administrative [`TravelerStore::clear`].
pub trait TravelerStore: Send + Sync {
    /// Create a single traveler.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Duplicate`] if the ITS is already registered
    /// - [`crate::Error::Conflict`] on a passport/phone uniqueness violation
    fn create_traveler(
        &self,
        traveler: &NewTraveler,
    ) -> impl Future<Output = Result<Traveler>> + Send;

    /// Insert a batch of travelers atomically (CSV import).
    ///
    /// All rows commit together or none do.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`TravelerStore::create_traveler`]; the whole
    /// batch rolls back on the first failure.
    fn import_travelers(
        &self,
        travelers: &[NewTraveler],
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Fetch a traveler by ITS.
    ///
    /// # Errors
    ///
    /// [`crate::Error::NotFound`] if no traveler has that ITS.
    fn traveler(&self, its: Its) -> impl Future<Output = Result<Traveler>> + Send;

    /// One page of travelers in ITS order, plus the total count.
    ///
    /// `page` is 1-based.
    ///
    /// # Errors
    ///
    /// Returns error if the storage query fails.
    fn travelers_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<(Vec<Traveler>, u64)>> + Send;

    /// Mark a traveler as arrived with the given timestamp.
    ///
    /// Marking an already-arrived traveler refreshes the timestamp.
    ///
    /// # Errors
    ///
    /// [`crate::Error::NotFound`] if no traveler has that ITS.
    fn mark_arrived(
        &self,
        its: Its,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<Traveler>> + Send;

    /// All arrived travelers, most recent arrival first.
    ///
    /// # Errors
    ///
    /// Returns error if the storage query fails.
    fn arrived(&self) -> impl Future<Output = Result<Vec<Traveler>>> + Send;

    /// Count of arrived travelers.
    ///
    /// # Errors
    ///
    /// Returns error if the storage query fails.
    fn arrived_count(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Assign a SIM phone number to a traveler.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::NotFound`] if no traveler has that ITS
    /// - [`crate::Error::Conflict`] if the phone is already assigned
    fn assign_phone(
        &self,
        its: Its,
        phone: &str,
    ) -> impl Future<Output = Result<Traveler>> + Send;

    /// Administrative bulk-clear of all traveler rows.
    ///
    /// Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns error if the storage query fails.
    fn clear(&self) -> impl Future<Output = Result<u64>> + Send;
}
