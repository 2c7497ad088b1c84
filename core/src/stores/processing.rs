//! Processed-record store trait backing the customs pipeline.

use crate::error::Result;
use crate::types::{ProcessedFields, ProcessedRecord};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Store for per-operator processed-record batches.
///
/// The (traveler, operator) uniqueness invariant is enforced here by a
/// storage constraint; the duplicate check happens before any mutation.
pub trait ProcessingStore: Send + Sync {
    /// Apply an operator's edit to the traveler and append the snapshot,
    /// in one transaction.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Duplicate`] if this operator already processed
    ///   this traveler (checked before mutating anything)
    /// - [`crate::Error::NotFound`] if the traveler does not exist
    /// - [`crate::Error::Conflict`] if a document-uniqueness constraint on
    ///   the traveler table fires; the transaction is rolled back cleanly
    fn record_processed(
        &self,
        operator: &str,
        fields: &ProcessedFields,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<ProcessedRecord>> + Send;

    /// The operator's pending batch, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns error if the storage query fails.
    fn pending(&self, operator: &str) -> impl Future<Output = Result<Vec<ProcessedRecord>>> + Send;

    /// Number of records in the operator's pending batch.
    ///
    /// # Errors
    ///
    /// Returns error if the storage query fails.
    fn pending_count(&self, operator: &str) -> impl Future<Output = Result<u64>> + Send;

    /// Atomically read and delete the operator's pending batch.
    ///
    /// The returned snapshot is fetched before the delete commits, so a
    /// crash mid-flush can never lose records that were never returned.
    /// An empty batch yields an empty `Vec`, not an error.
    ///
    /// # Errors
    ///
    /// Returns error if the storage transaction fails.
    fn drain(&self, operator: &str) -> impl Future<Output = Result<Vec<ProcessedRecord>>> + Send;
}
