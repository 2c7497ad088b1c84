//! Traveler store implementation.

use caravan_core::error::{Error, Result};
use caravan_core::stores::TravelerStore;
use caravan_core::types::{Its, NewTraveler, Traveler};
use chrono::{DateTime, Utc};
use sqlx::Postgres;

use crate::rows::TravelerRow;
use crate::{storage, unique_violation, PostgresStores};

const COLS: &str = "its, first_name, middle_name, last_name, date_of_birth, passport_no, \
                    passport_expiry, visa_no, transport_mode, phone, arrived, arrived_at";

fn map_insert_err(err: sqlx::Error, its: Its) -> Error {
    match unique_violation(&err).as_deref() {
        Some("travelers_pkey") => {
            Error::Duplicate(format!("traveler {its} is already registered"))
        }
        Some(constraint) => Error::Conflict(format!("constraint {constraint} violated")),
        None => Error::Storage(format!("failed to insert traveler: {err}")),
    }
}

async fn insert_traveler<'e, E>(executor: E, new: &NewTraveler) -> Result<Traveler>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let sql = format!(
        "INSERT INTO travelers \
         (its, first_name, middle_name, last_name, date_of_birth, passport_no, \
          passport_expiry, visa_no) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {COLS}"
    );
    let row: TravelerRow = sqlx::query_as(&sql)
        .bind(new.its.get())
        .bind(&new.first_name)
        .bind(&new.middle_name)
        .bind(&new.last_name)
        .bind(new.date_of_birth)
        .bind(&new.passport_no)
        .bind(new.passport_expiry)
        .bind(&new.visa_no)
        .fetch_one(executor)
        .await
        .map_err(|e| map_insert_err(e, new.its))?;
    row.try_into()
}

impl TravelerStore for PostgresStores {
    async fn create_traveler(&self, traveler: &NewTraveler) -> Result<Traveler> {
        insert_traveler(self.pool(), traveler).await
    }

    async fn import_travelers(&self, travelers: &[NewTraveler]) -> Result<u64> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(storage("failed to begin import"))?;
        for new in travelers {
            insert_traveler(&mut *tx, new).await?;
        }
        tx.commit()
            .await
            .map_err(storage("failed to commit import"))?;
        Ok(travelers.len() as u64)
    }

    async fn traveler(&self, its: Its) -> Result<Traveler> {
        let sql = format!("SELECT {COLS} FROM travelers WHERE its = $1");
        let row: Option<TravelerRow> = sqlx::query_as(&sql)
            .bind(its.get())
            .fetch_optional(self.pool())
            .await
            .map_err(storage("failed to fetch traveler"))?;
        row.ok_or_else(|| Error::not_found("traveler", its))?.try_into()
    }

    async fn travelers_page(&self, page: u32, page_size: u32) -> Result<(Vec<Traveler>, u64)> {
        let offset = i64::from(page.max(1) - 1) * i64::from(page_size);
        let sql = format!("SELECT {COLS} FROM travelers ORDER BY its LIMIT $1 OFFSET $2");
        let rows: Vec<TravelerRow> = sqlx::query_as(&sql)
            .bind(i64::from(page_size))
            .bind(offset)
            .fetch_all(self.pool())
            .await
            .map_err(storage("failed to list travelers"))?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM travelers")
            .fetch_one(self.pool())
            .await
            .map_err(storage("failed to count travelers"))?;

        let travelers = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<Traveler>>>()?;
        Ok((travelers, total.unsigned_abs()))
    }

    async fn mark_arrived(&self, its: Its, at: DateTime<Utc>) -> Result<Traveler> {
        let sql = format!(
            "UPDATE travelers SET arrived = TRUE, arrived_at = $2 WHERE its = $1 RETURNING {COLS}"
        );
        let row: Option<TravelerRow> = sqlx::query_as(&sql)
            .bind(its.get())
            .bind(at)
            .fetch_optional(self.pool())
            .await
            .map_err(storage("failed to mark arrival"))?;
        row.ok_or_else(|| Error::not_found("traveler", its))?.try_into()
    }

    async fn arrived(&self) -> Result<Vec<Traveler>> {
        let sql = format!("SELECT {COLS} FROM travelers WHERE arrived ORDER BY arrived_at DESC");
        let rows: Vec<TravelerRow> = sqlx::query_as(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(storage("failed to list arrivals"))?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn arrived_count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM travelers WHERE arrived")
            .fetch_one(self.pool())
            .await
            .map_err(storage("failed to count arrivals"))?;
        Ok(count.unsigned_abs())
    }

    async fn assign_phone(&self, its: Its, phone: &str) -> Result<Traveler> {
        let sql =
            format!("UPDATE travelers SET phone = $2 WHERE its = $1 RETURNING {COLS}");
        let row: Option<TravelerRow> = sqlx::query_as(&sql)
            .bind(its.get())
            .bind(phone)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| {
                if unique_violation(&e).is_some() {
                    Error::Conflict(format!("phone {phone} is already assigned"))
                } else {
                    Error::Storage(format!("failed to assign phone: {e}"))
                }
            })?;
        row.ok_or_else(|| Error::not_found("traveler", its))?.try_into()
    }

    async fn clear(&self) -> Result<u64> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(storage("failed to begin clear"))?;
        // Bookings, processed records, and groups go with their travelers
        // via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM travelers")
            .execute(&mut *tx)
            .await
            .map_err(storage("failed to clear travelers"))?;
        sqlx::query("UPDATE transport_units SET seats_remaining = capacity WHERE capacity IS NOT NULL")
            .execute(&mut *tx)
            .await
            .map_err(storage("failed to reset seat counters"))?;
        tx.commit()
            .await
            .map_err(storage("failed to commit clear"))?;
        Ok(result.rows_affected())
    }
}
