//! Duplicate-guarded customs processing pipeline.
//!
//! Each customs operator works through traveler records one at a time:
//! they correct the traveler's fields, the edit is applied, and a snapshot
//! is appended to the operator's pending batch. An operator can never
//! process the same traveler twice; the batch is flushed for printing
//! either on demand or automatically once it reaches a threshold.

use chrono::Utc;

use crate::error::{Error, Result};
use crate::import;
use crate::stores::ProcessingStore;
use crate::types::{Its, ProcessedFields, ProcessedRecord};

/// Batch size at which [`Pipeline::should_auto_flush`] fires.
pub const DEFAULT_BATCH_THRESHOLD: u64 = 10;

/// Raw operator input for processing one traveler.
///
/// Dates arrive as strings straight off the form; validation turns this
/// into a [`ProcessedFields`].
#[derive(Clone, Debug)]
pub struct ProcessRequest {
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
    /// Passport expiry date, as entered.
    pub passport_expiry: String,
    /// Visa number.
    pub visa_no: Option<String>,
}

/// The processing service: validation, the duplicate guard, and batch
/// flushing over a [`ProcessingStore`].
#[derive(Clone, Debug)]
pub struct Pipeline<S> {
    store: S,
    batch_threshold: u64,
}

impl<S: ProcessingStore> Pipeline<S> {
    /// Build a pipeline with the default batch threshold.
    pub fn new(store: S) -> Self {
        Self::with_threshold(store, DEFAULT_BATCH_THRESHOLD)
    }

    /// Build a pipeline with an explicit batch threshold.
    pub fn with_threshold(store: S, batch_threshold: u64) -> Self {
        Self {
            store,
            batch_threshold,
        }
    }

    /// Validate and apply one operator edit.
    ///
    /// On success the traveler row carries the corrected fields and the
    /// returned snapshot sits in the operator's pending batch.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for malformed input, before anything mutates
    /// - [`Error::Duplicate`] if this operator already processed the traveler
    /// - [`Error::NotFound`] if the traveler does not exist
    /// - [`Error::Conflict`] if a document-uniqueness constraint fires
    pub async fn process(
        &self,
        operator: &str,
        request: ProcessRequest,
    ) -> Result<ProcessedRecord> {
        let fields = validate(&request)?;
        let record = self
            .store
            .record_processed(operator, &fields, Utc::now())
            .await?;
        tracing::info!(
            operator,
            its = %record.its,
            batch_row = record.id,
            "processed traveler"
        );
        Ok(record)
    }

    /// The operator's pending batch, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the storage query fails.
    pub async fn pending(&self, operator: &str) -> Result<Vec<ProcessedRecord>> {
        self.store.pending(operator).await
    }

    /// Number of records in the operator's pending batch.
    ///
    /// # Errors
    ///
    /// Returns error if the storage query fails.
    pub async fn pending_count(&self, operator: &str) -> Result<u64> {
        self.store.pending_count(operator).await
    }

    /// Whether the operator's batch has reached the flush threshold.
    ///
    /// # Errors
    ///
    /// Returns error if the storage query fails.
    pub async fn should_auto_flush(&self, operator: &str) -> Result<bool> {
        Ok(self.store.pending_count(operator).await? >= self.batch_threshold)
    }

    /// Flush the operator's batch: return the snapshots and clear them.
    ///
    /// An empty batch flushes to an empty list. The snapshots are read
    /// before the delete commits, so nothing is lost if the flush fails
    /// partway.
    ///
    /// # Errors
    ///
    /// Returns error if the storage transaction fails.
    pub async fn flush(&self, operator: &str) -> Result<Vec<ProcessedRecord>> {
        let batch = self.store.drain(operator).await?;
        tracing::info!(operator, batch_size = batch.len(), "flushed batch");
        Ok(batch)
    }
}

/// Validate raw operator input into an applicable field set.
fn validate(request: &ProcessRequest) -> Result<ProcessedFields> {
    let its = Its::new(request.its)?;

    let first_name = required(&request.first_name, "first name")?;
    let last_name = required(&request.last_name, "last name")?;
    let passport_no = required(&request.passport_no, "passport number")?;
    let passport_expiry = import::parse_date(&request.passport_expiry)?;

    Ok(ProcessedFields {
        its,
        first_name,
        middle_name: trimmed_opt(request.middle_name.as_deref()),
        last_name,
        passport_no,
        passport_expiry,
        visa_no: trimmed_opt(request.visa_no.as_deref()),
    })
}

fn required(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn trimmed_opt(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use crate::memory::MemoryStores;
    use crate::stores::TravelerStore;
    use crate::types::NewTraveler;

    fn seed_traveler(its: i64) -> NewTraveler {
        NewTraveler {
            its: Its::new(its).unwrap(),
            first_name: "Amina".into(),
            middle_name: None,
            last_name: "Khan".into(),
            date_of_birth: None,
            passport_no: None,
            passport_expiry: None,
            visa_no: None,
        }
    }

    fn request(its: i64) -> ProcessRequest {
        ProcessRequest {
            its,
            first_name: "Amina".into(),
            middle_name: Some("Bibi".into()),
            last_name: "Khan".into(),
            passport_no: format!("P{its}"),
            passport_expiry: "2030-01-01".into(),
            visa_no: None,
        }
    }

    #[tokio::test]
    async fn process_updates_traveler_and_queues_snapshot() {
        let stores = MemoryStores::new();
        stores.create_traveler(&seed_traveler(100)).await.unwrap();
        let pipeline = Pipeline::new(stores.clone());

        let record = pipeline.process("op1", request(100)).await.unwrap();
        assert_eq!(record.operator, "op1");
        assert_eq!(record.passport_no, "P100");

        let traveler = stores.traveler(Its::new(100).unwrap()).await.unwrap();
        assert_eq!(traveler.passport_no.as_deref(), Some("P100"));
        assert_eq!(traveler.middle_name.as_deref(), Some("Bibi"));

        assert_eq!(pipeline.pending("op1").await.unwrap().len(), 1);
        assert_eq!(pipeline.pending_count("op1").await.unwrap(), 1);
        assert_eq!(pipeline.pending_count("op2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn same_operator_cannot_process_twice() {
        let stores = MemoryStores::new();
        stores.create_traveler(&seed_traveler(100)).await.unwrap();
        let pipeline = Pipeline::new(stores);

        pipeline.process("op1", request(100)).await.unwrap();
        let err = pipeline.process("op1", request(100)).await.unwrap_err();
        assert!(matches!(err, Error::Duplicate(_)));

        // A different operator is a separate batch.
        let its = 100;
        let other = pipeline.process("op2", request(its)).await;
        assert!(other.is_ok());
    }

    #[tokio::test]
    async fn duplicate_leaves_batch_untouched() {
        let stores = MemoryStores::new();
        stores.create_traveler(&seed_traveler(100)).await.unwrap();
        let pipeline = Pipeline::new(stores);

        pipeline.process("op1", request(100)).await.unwrap();
        let _ = pipeline.process("op1", request(100)).await;
        assert_eq!(pipeline.pending("op1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_traveler_is_not_found() {
        let pipeline = Pipeline::new(MemoryStores::new());
        let err = pipeline.process("op1", request(999)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn validation_rejects_before_any_mutation() {
        let stores = MemoryStores::new();
        stores.create_traveler(&seed_traveler(100)).await.unwrap();
        let pipeline = Pipeline::new(stores);

        let mut bad = request(100);
        bad.passport_expiry = "soon".into();
        let err = pipeline.process("op1", bad).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(pipeline.pending("op1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn auto_flush_fires_at_threshold() {
        let stores = MemoryStores::new();
        for its in 1..=3 {
            stores.create_traveler(&seed_traveler(its)).await.unwrap();
        }
        let pipeline = Pipeline::with_threshold(stores, 3);

        for its in 1..=2 {
            pipeline.process("op1", request(its)).await.unwrap();
            assert!(!pipeline.should_auto_flush("op1").await.unwrap());
        }
        pipeline.process("op1", request(3)).await.unwrap();
        assert!(pipeline.should_auto_flush("op1").await.unwrap());
    }

    #[tokio::test]
    async fn flush_returns_batch_in_order_and_clears_it() {
        let stores = MemoryStores::new();
        for its in 1..=3 {
            stores.create_traveler(&seed_traveler(its)).await.unwrap();
        }
        let pipeline = Pipeline::new(stores);

        for its in 1..=3 {
            pipeline.process("op1", request(its)).await.unwrap();
        }

        let batch = pipeline.flush("op1").await.unwrap();
        let order: Vec<i64> = batch.iter().map(|r| r.its.get()).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert!(pipeline.pending("op1").await.unwrap().is_empty());

        // Empty flush is a no-op, not an error.
        assert!(pipeline.flush("op1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn flush_resets_the_duplicate_guard() {
        let stores = MemoryStores::new();
        stores.create_traveler(&seed_traveler(100)).await.unwrap();
        let pipeline = Pipeline::new(stores);

        pipeline.process("op1", request(100)).await.unwrap();
        pipeline.flush("op1").await.unwrap();
        // After the batch is purged the operator may process again.
        assert!(pipeline.process("op1", request(100)).await.is_ok());
    }
}
