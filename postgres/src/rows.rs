//! Row structs and their conversions into domain types.

use caravan_core::error::{Error, Result};
use caravan_core::types::{
    Booking, BookingId, Designation, Its, ProcessedRecord, TransportUnit, Traveler, UnitAttrs,
    UnitId, UnitKind, User,
};
use chrono::{DateTime, NaiveDate, Utc};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TravelerRow {
    pub its: i64,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub passport_no: Option<String>,
    pub passport_expiry: Option<NaiveDate>,
    pub visa_no: Option<String>,
    pub transport_mode: Option<String>,
    pub phone: Option<String>,
    pub arrived: bool,
    pub arrived_at: Option<DateTime<Utc>>,
}

impl TryFrom<TravelerRow> for Traveler {
    type Error = Error;

    fn try_from(row: TravelerRow) -> Result<Self> {
        Ok(Self {
            its: Its::new(row.its)?,
            first_name: row.first_name,
            middle_name: row.middle_name,
            last_name: row.last_name,
            date_of_birth: row.date_of_birth,
            passport_no: row.passport_no,
            passport_expiry: row.passport_expiry,
            visa_no: row.visa_no,
            transport_mode: row.transport_mode,
            phone: row.phone,
            arrived: row.arrived,
            arrived_at: row.arrived_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProcessedRow {
    pub id: i64,
    pub its: i64,
    pub operator: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub passport_no: String,
    pub passport_expiry: NaiveDate,
    pub visa_no: Option<String>,
    pub processed_at: DateTime<Utc>,
}

impl TryFrom<ProcessedRow> for ProcessedRecord {
    type Error = Error;

    fn try_from(row: ProcessedRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            its: Its::new(row.its)?,
            operator: row.operator,
            first_name: row.first_name,
            middle_name: row.middle_name,
            last_name: row.last_name,
            passport_no: row.passport_no,
            passport_expiry: row.passport_expiry,
            visa_no: row.visa_no,
            processed_at: row.processed_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UnitRow {
    pub id: i64,
    pub kind: String,
    pub departure_time: Option<DateTime<Utc>>,
    pub unit_number: Option<i32>,
    pub capacity: Option<i32>,
    pub seats_remaining: Option<i32>,
    pub company: Option<String>,
}

impl TryFrom<UnitRow> for TransportUnit {
    type Error = Error;

    fn try_from(row: UnitRow) -> Result<Self> {
        let kind = UnitKind::parse(&row.kind)?;
        let attrs = if kind.is_seated() {
            match (row.unit_number, row.capacity, row.seats_remaining) {
                (Some(unit_number), Some(capacity), Some(seats_remaining)) => UnitAttrs::Seated {
                    unit_number,
                    capacity,
                    seats_remaining,
                },
                _ => {
                    return Err(Error::Storage(format!(
                        "seated unit {} is missing seat columns",
                        row.id
                    )));
                }
            }
        } else {
            match row.company {
                Some(company) => UnitAttrs::Carrier { company },
                None => {
                    return Err(Error::Storage(format!(
                        "carrier unit {} is missing its company",
                        row.id
                    )));
                }
            }
        };
        Ok(Self {
            id: UnitId(row.id),
            kind,
            departure_time: row.departure_time,
            attrs,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BookingRow {
    pub id: i64,
    pub its: i64,
    pub unit_id: i64,
    pub kind: String,
    pub seat: Option<i32>,
    pub booked_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = Error;

    fn try_from(row: BookingRow) -> Result<Self> {
        Ok(Self {
            id: BookingId(row.id),
            its: Its::new(row.its)?,
            unit_id: UnitId(row.unit_id),
            kind: UnitKind::parse(&row.kind)?,
            seat: row.seat,
            booked_at: row.booked_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    pub username: String,
    pub password_hash: String,
    pub designation: String,
}

impl TryFrom<UserRow> for User {
    type Error = Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(Self {
            username: row.username,
            password_hash: row.password_hash,
            designation: Designation::parse(&row.designation)?,
        })
    }
}
