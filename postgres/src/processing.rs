//! Processing store implementation.

use caravan_core::error::{Error, Result};
use caravan_core::stores::ProcessingStore;
use caravan_core::types::{ProcessedFields, ProcessedRecord};
use chrono::{DateTime, Utc};

use crate::rows::ProcessedRow;
use crate::{storage, unique_violation, PostgresStores};

const COLS: &str = "id, its, operator, first_name, middle_name, last_name, passport_no, \
                    passport_expiry, visa_no, processed_at";

impl ProcessingStore for PostgresStores {
    async fn record_processed(
        &self,
        operator: &str,
        fields: &ProcessedFields,
        at: DateTime<Utc>,
    ) -> Result<ProcessedRecord> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(storage("failed to begin processing"))?;

        // Duplicate guard before anything mutates.
        let (already,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM processed_records WHERE its = $1 AND operator = $2)",
        )
        .bind(fields.its.get())
        .bind(operator)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage("failed duplicate check"))?;
        if already {
            return Err(Error::Duplicate(format!(
                "traveler {} was already processed by {operator}",
                fields.its
            )));
        }

        let updated = sqlx::query(
            "UPDATE travelers SET first_name = $2, middle_name = $3, last_name = $4, \
             passport_no = $5, passport_expiry = $6, visa_no = $7 WHERE its = $1",
        )
        .bind(fields.its.get())
        .bind(&fields.first_name)
        .bind(&fields.middle_name)
        .bind(&fields.last_name)
        .bind(&fields.passport_no)
        .bind(fields.passport_expiry)
        .bind(&fields.visa_no)
        .execute(&mut *tx)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(constraint) => Error::Conflict(format!("constraint {constraint} violated")),
            None => Error::Storage(format!("failed to update traveler: {e}")),
        })?;
        if updated.rows_affected() == 0 {
            return Err(Error::not_found("traveler", fields.its));
        }

        let sql = format!(
            "INSERT INTO processed_records \
             (its, operator, first_name, middle_name, last_name, passport_no, \
              passport_expiry, visa_no, processed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLS}"
        );
        let row: ProcessedRow = sqlx::query_as(&sql)
            .bind(fields.its.get())
            .bind(operator)
            .bind(&fields.first_name)
            .bind(&fields.middle_name)
            .bind(&fields.last_name)
            .bind(&fields.passport_no)
            .bind(fields.passport_expiry)
            .bind(&fields.visa_no)
            .bind(at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match unique_violation(&e).as_deref() {
                // A concurrent process call for the same pair won the race.
                Some("processed_records_its_operator_key") => Error::Duplicate(format!(
                    "traveler {} was already processed by {operator}",
                    fields.its
                )),
                Some(constraint) => Error::Conflict(format!("constraint {constraint} violated")),
                None => Error::Storage(format!("failed to insert snapshot: {e}")),
            })?;

        tx.commit()
            .await
            .map_err(storage("failed to commit processing"))?;
        row.try_into()
    }

    async fn pending(&self, operator: &str) -> Result<Vec<ProcessedRecord>> {
        let sql =
            format!("SELECT {COLS} FROM processed_records WHERE operator = $1 ORDER BY id");
        let rows: Vec<ProcessedRow> = sqlx::query_as(&sql)
            .bind(operator)
            .fetch_all(self.pool())
            .await
            .map_err(storage("failed to list batch"))?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn pending_count(&self, operator: &str) -> Result<u64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM processed_records WHERE operator = $1")
                .bind(operator)
                .fetch_one(self.pool())
                .await
                .map_err(storage("failed to count batch"))?;
        Ok(count.unsigned_abs())
    }

    async fn drain(&self, operator: &str) -> Result<Vec<ProcessedRecord>> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(storage("failed to begin flush"))?;
        let sql =
            format!("DELETE FROM processed_records WHERE operator = $1 RETURNING {COLS}");
        let mut rows: Vec<ProcessedRow> = sqlx::query_as(&sql)
            .bind(operator)
            .fetch_all(&mut *tx)
            .await
            .map_err(storage("failed to drain batch"))?;
        tx.commit()
            .await
            .map_err(storage("failed to commit flush"))?;

        rows.sort_by_key(|r| r.id);
        rows.into_iter().map(TryInto::try_into).collect()
    }
}
