//! Transport unit and booking store implementation.
//!
//! `try_allocate` locks the unit row with `SELECT ... FOR UPDATE`, so seat
//! choice and counter decrement happen under the row lock; the unique
//! constraints are the backstop if two transactions still collide, and that
//! backstop surfaces as a retryable [`Error::Conflict`].

use caravan_core::allocator::lowest_free_seat;
use caravan_core::error::{Error, Result};
use caravan_core::stores::BookingStore;
use caravan_core::types::{
    Booking, BookingId, Its, NewUnit, TransportUnit, UnitId, UnitKind,
};
use chrono::{DateTime, Utc};

use crate::rows::{BookingRow, UnitRow};
use crate::{storage, unique_violation, PostgresStores};

const UNIT_COLS: &str = "id, kind, departure_time, unit_number, capacity, seats_remaining, company";
const BOOKING_COLS: &str = "id, its, unit_id, kind, seat, booked_at";

impl BookingStore for PostgresStores {
    async fn add_unit(&self, unit: &NewUnit) -> Result<TransportUnit> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(storage("failed to begin unit insert"))?;

        let unit_number = if unit.kind.is_seated() {
            let (next,): (i32,) = sqlx::query_as(
                "SELECT COALESCE(MAX(unit_number), 0) + 1 FROM transport_units WHERE kind = $1",
            )
            .bind(unit.kind.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(storage("failed to number unit"))?;
            Some(next)
        } else {
            None
        };

        let sql = format!(
            "INSERT INTO transport_units \
             (kind, departure_time, unit_number, capacity, seats_remaining, company) \
             VALUES ($1, $2, $3, $4, $4, $5) \
             RETURNING {UNIT_COLS}"
        );
        let row: UnitRow = sqlx::query_as(&sql)
            .bind(unit.kind.as_str())
            .bind(unit.departure_time)
            .bind(unit_number)
            .bind(unit.capacity)
            .bind(&unit.company)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match unique_violation(&e) {
                Some(_) => Error::Conflict("unit numbering raced".into()),
                None => Error::Storage(format!("failed to insert unit: {e}")),
            })?;

        tx.commit()
            .await
            .map_err(storage("failed to commit unit insert"))?;
        row.try_into()
    }

    async fn unit(&self, id: UnitId) -> Result<TransportUnit> {
        let sql = format!("SELECT {UNIT_COLS} FROM transport_units WHERE id = $1");
        let row: Option<UnitRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .fetch_optional(self.pool())
            .await
            .map_err(storage("failed to fetch unit"))?;
        row.ok_or_else(|| Error::not_found("transport unit", id))?
            .try_into()
    }

    async fn units(&self, kind: Option<UnitKind>) -> Result<Vec<TransportUnit>> {
        let rows: Vec<UnitRow> = match kind {
            Some(kind) => {
                let sql = format!(
                    "SELECT {UNIT_COLS} FROM transport_units WHERE kind = $1 ORDER BY id"
                );
                sqlx::query_as(&sql)
                    .bind(kind.as_str())
                    .fetch_all(self.pool())
                    .await
            }
            None => {
                let sql = format!("SELECT {UNIT_COLS} FROM transport_units ORDER BY id");
                sqlx::query_as(&sql).fetch_all(self.pool()).await
            }
        }
        .map_err(storage("failed to list units"))?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn try_allocate(
        &self,
        its: Its,
        unit_id: UnitId,
        at: DateTime<Utc>,
    ) -> Result<Booking> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(storage("failed to begin allocation"))?;

        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM travelers WHERE its = $1)")
                .bind(its.get())
                .fetch_one(&mut *tx)
                .await
                .map_err(storage("failed traveler check"))?;
        if !exists {
            return Err(Error::not_found("traveler", its));
        }

        let sql =
            format!("SELECT {UNIT_COLS} FROM transport_units WHERE id = $1 FOR UPDATE");
        let row: Option<UnitRow> = sqlx::query_as(&sql)
            .bind(unit_id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage("failed to lock unit"))?;
        let unit: TransportUnit = row
            .ok_or_else(|| Error::not_found("transport unit", unit_id))?
            .try_into()?;

        let (already,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM bookings WHERE its = $1 AND kind = $2)",
        )
        .bind(its.get())
        .bind(unit.kind.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(storage("failed duplicate check"))?;
        if already {
            return Err(Error::Duplicate(format!(
                "traveler {its} already holds a {} booking",
                unit.kind
            )));
        }

        let seat = if unit.kind.is_seated() {
            if unit.seats_remaining() == Some(0) {
                return Err(Error::Full { unit: unit_id.0 });
            }
            let taken: Vec<(i32,)> = sqlx::query_as(
                "SELECT seat FROM bookings WHERE unit_id = $1 AND seat IS NOT NULL",
            )
            .bind(unit_id.0)
            .fetch_all(&mut *tx)
            .await
            .map_err(storage("failed to list taken seats"))?;
            let taken: Vec<i32> = taken.into_iter().map(|(s,)| s).collect();

            sqlx::query(
                "UPDATE transport_units SET seats_remaining = seats_remaining - 1 WHERE id = $1",
            )
            .bind(unit_id.0)
            .execute(&mut *tx)
            .await
            .map_err(|e| match &e {
                // CHECK (seats_remaining >= 0) fired under concurrency.
                sqlx::Error::Database(db) if db.is_check_violation() => {
                    Error::Full { unit: unit_id.0 }
                }
                _ => Error::Storage(format!("failed to decrement seats: {e}")),
            })?;
            Some(lowest_free_seat(&taken))
        } else {
            None
        };

        let sql = format!(
            "INSERT INTO bookings (its, unit_id, kind, seat, booked_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {BOOKING_COLS}"
        );
        let row: BookingRow = sqlx::query_as(&sql)
            .bind(its.get())
            .bind(unit_id.0)
            .bind(unit.kind.as_str())
            .bind(seat)
            .bind(at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match unique_violation(&e).as_deref() {
                Some("bookings_its_kind_key") => Error::Duplicate(format!(
                    "traveler {its} already holds a {} booking",
                    unit.kind
                )),
                Some(constraint) => {
                    Error::Conflict(format!("lost seat race on {constraint}"))
                }
                None => Error::Storage(format!("failed to insert booking: {e}")),
            })?;

        tx.commit()
            .await
            .map_err(storage("failed to commit allocation"))?;
        row.try_into()
    }

    async fn cancel(&self, id: BookingId) -> Result<()> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(storage("failed to begin cancellation"))?;

        let row: Option<(i64, Option<i32>)> =
            sqlx::query_as("DELETE FROM bookings WHERE id = $1 RETURNING unit_id, seat")
                .bind(id.0)
                .fetch_optional(&mut *tx)
                .await
                .map_err(storage("failed to delete booking"))?;
        let (unit_id, seat) = row.ok_or_else(|| Error::not_found("booking", id))?;

        if seat.is_some() {
            sqlx::query(
                "UPDATE transport_units SET seats_remaining = seats_remaining + 1 WHERE id = $1",
            )
            .bind(unit_id)
            .execute(&mut *tx)
            .await
            .map_err(storage("failed to release seat"))?;
        }

        tx.commit()
            .await
            .map_err(storage("failed to commit cancellation"))?;
        Ok(())
    }

    async fn booking(&self, id: BookingId) -> Result<Booking> {
        let sql = format!("SELECT {BOOKING_COLS} FROM bookings WHERE id = $1");
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .fetch_optional(self.pool())
            .await
            .map_err(storage("failed to fetch booking"))?;
        row.ok_or_else(|| Error::not_found("booking", id))?.try_into()
    }

    async fn bookings_for(&self, its: Its) -> Result<Vec<Booking>> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM travelers WHERE its = $1)")
                .bind(its.get())
                .fetch_one(self.pool())
                .await
                .map_err(storage("failed traveler check"))?;
        if !exists {
            return Err(Error::not_found("traveler", its));
        }

        let sql = format!("SELECT {BOOKING_COLS} FROM bookings WHERE its = $1 ORDER BY id");
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(its.get())
            .fetch_all(self.pool())
            .await
            .map_err(storage("failed to list bookings"))?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}
