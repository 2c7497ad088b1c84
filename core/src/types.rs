//! Domain types for the Caravan traveler logistics system.
//!
//! Value objects and entities shared between the services, the store
//! implementations, and the HTTP layer. Transport units use a tagged kind
//! plus a kind-specific payload instead of a subtype hierarchy; dispatch
//! is always an explicit match on [`UnitKind`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

// ============================================================================
// Identifiers
// ============================================================================

/// The unique traveler identifier (a positive integer issued upstream).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Its(i64);

impl Its {
    /// Create an `Its`, rejecting zero and negative values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `raw` is not positive.
    pub fn new(raw: i64) -> Result<Self> {
        if raw > 0 {
            Ok(Self(raw))
        } else {
            Err(Error::Validation(format!(
                "ITS must be a positive integer, got {raw}"
            )))
        }
    }

    /// Get the raw integer value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Its {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a transport unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub i64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(pub i64);

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a traveler group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub i64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Travelers
// ============================================================================

/// A traveler record, keyed by ITS.
///
/// Most document fields are optional until an operator processes the
/// record through the pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Traveler {
    /// Traveler identifier.
    pub its: Its,
    /// First name.
    pub first_name: String,
    /// Middle name, when present.
    pub middle_name: Option<String>,
    /// Last name.
    pub last_name: String,
    /// Date of birth.
    pub date_of_birth: Option<NaiveDate>,
    /// Passport number (unique across travelers once set).
    pub passport_no: Option<String>,
    /// Passport expiry date.
    pub passport_expiry: Option<NaiveDate>,
    /// Visa number.
    pub visa_no: Option<String>,
    /// Free-form transport mode note from intake.
    pub transport_mode: Option<String>,
    /// Assigned SIM phone number (unique once set).
    pub phone: Option<String>,
    /// Whether the traveler has been marked as arrived.
    pub arrived: bool,
    /// When the traveler was marked as arrived.
    pub arrived_at: Option<DateTime<Utc>>,
}

/// Input for creating a traveler (manual form entry or a CSV row).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewTraveler {
    /// Traveler identifier.
    pub its: Its,
    /// First name.
    pub first_name: String,
    /// Middle name, when present.
    pub middle_name: Option<String>,
    /// Last name.
    pub last_name: String,
    /// Date of birth.
    pub date_of_birth: Option<NaiveDate>,
    /// Passport number.
    pub passport_no: Option<String>,
    /// Passport expiry date.
    pub passport_expiry: Option<NaiveDate>,
    /// Visa number.
    pub visa_no: Option<String>,
}

// ============================================================================
// Processing
// ============================================================================

/// Validated field set an operator submits when processing a traveler.
///
/// Produced by [`crate::pipeline::Pipeline::process`] after validation;
/// stores apply it verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessedFields {
    /// Traveler being processed.
    pub its: Its,
    /// Corrected first name.
    pub first_name: String,
    /// Corrected middle name.
    pub middle_name: Option<String>,
    /// Corrected last name.
    pub last_name: String,
    /// Passport number.
    pub passport_no: String,
    /// Passport expiry date.
    pub passport_expiry: NaiveDate,
    /// Visa number.
    pub visa_no: Option<String>,
}

/// Snapshot of a traveler at the moment an operator finalized their edit.
///
/// At most one exists per (traveler, operator) pair; rows are purged when
/// the operator flushes their batch for printing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    /// Row identifier (insertion order).
    pub id: i64,
    /// Traveler identifier.
    pub its: Its,
    /// Username of the operator who processed the record.
    pub operator: String,
    /// First name at processing time.
    pub first_name: String,
    /// Middle name at processing time.
    pub middle_name: Option<String>,
    /// Last name at processing time.
    pub last_name: String,
    /// Passport number at processing time.
    pub passport_no: String,
    /// Passport expiry at processing time.
    pub passport_expiry: NaiveDate,
    /// Visa number at processing time.
    pub visa_no: Option<String>,
    /// When the operator processed the record.
    pub processed_at: DateTime<Utc>,
}

// ============================================================================
// Transport
// ============================================================================

/// Transport unit kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Seat-based road transport.
    Bus,
    /// Carrier-operated rail transport.
    Train,
    /// Carrier-operated air transport.
    Plane,
    /// Seat-based short-haul transport.
    Shuttle,
}

impl UnitKind {
    /// Stable lowercase tag used in storage and query strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bus => "bus",
            Self::Train => "train",
            Self::Plane => "plane",
            Self::Shuttle => "shuttle",
        }
    }

    /// Parse a storage tag back into a kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an unknown tag.
    pub fn parse(tag: &str) -> Result<Self> {
        match tag {
            "bus" => Ok(Self::Bus),
            "train" => Ok(Self::Train),
            "plane" => Ok(Self::Plane),
            "shuttle" => Ok(Self::Shuttle),
            other => Err(Error::Validation(format!(
                "unknown transport kind: {other}"
            ))),
        }
    }

    /// Whether units of this kind issue numbered seats and track capacity.
    #[must_use]
    pub const fn is_seated(self) -> bool {
        matches!(self, Self::Bus | Self::Shuttle)
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific attributes of a transport unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitAttrs {
    /// Bus/Shuttle: a numbered vehicle with bounded seats.
    Seated {
        /// Sequential unit number within the kind (1-based).
        unit_number: i32,
        /// Total seat count.
        capacity: i32,
        /// Seats still available. Never negative.
        seats_remaining: i32,
    },
    /// Train/Plane: an external carrier without per-seat tracking.
    Carrier {
        /// Operating company.
        company: String,
    },
}

/// One physical transport run travelers can be booked onto.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransportUnit {
    /// Unit identifier.
    pub id: UnitId,
    /// Transport kind tag.
    pub kind: UnitKind,
    /// Scheduled departure.
    pub departure_time: Option<DateTime<Utc>>,
    /// Kind-specific attributes.
    pub attrs: UnitAttrs,
}

impl TransportUnit {
    /// Seats remaining, or `None` for carrier kinds.
    #[must_use]
    pub const fn seats_remaining(&self) -> Option<i32> {
        match &self.attrs {
            UnitAttrs::Seated {
                seats_remaining, ..
            } => Some(*seats_remaining),
            UnitAttrs::Carrier { .. } => None,
        }
    }
}

/// Input for registering a new transport unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewUnit {
    /// Transport kind.
    pub kind: UnitKind,
    /// Scheduled departure.
    pub departure_time: Option<DateTime<Utc>>,
    /// Seat count; required for seated kinds.
    pub capacity: Option<i32>,
    /// Operating company; required for carrier kinds.
    pub company: Option<String>,
}

/// A traveler's claim on a transport unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking identifier.
    pub id: BookingId,
    /// Traveler holding the booking.
    pub its: Its,
    /// Unit being booked.
    pub unit_id: UnitId,
    /// Kind tag copied from the unit; backs the one-booking-per-mode rule.
    pub kind: UnitKind,
    /// Issued seat number for seated kinds, dense from 1.
    pub seat: Option<i32>,
    /// When the booking was made.
    pub booked_at: DateTime<Utc>,
}

// ============================================================================
// Groups
// ============================================================================

/// A leader traveler and the members registered behind them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Group identifier.
    pub id: GroupId,
    /// Leader traveler. Never appears among `members`.
    pub leader: Its,
    /// Member travelers.
    pub members: Vec<Its>,
    /// When the group was registered.
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Operators
// ============================================================================

/// Operator role; controls which flows an account may invoke.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Designation {
    /// Full access, including account management and bulk clears.
    Admin,
    /// Customs processing and traveler intake.
    Customs,
    /// Arrival marking.
    Arrival,
}

impl Designation {
    /// Stable lowercase tag used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Customs => "customs",
            Self::Arrival => "arrival",
        }
    }

    /// Parse a storage tag back into a designation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an unknown tag.
    pub fn parse(tag: &str) -> Result<Self> {
        match tag {
            "admin" => Ok(Self::Admin),
            "customs" => Ok(Self::Customs),
            "arrival" => Ok(Self::Arrival),
            other => Err(Error::Validation(format!("unknown designation: {other}"))),
        }
    }
}

impl fmt::Display for Designation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operator account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique login name.
    pub username: String,
    /// SHA-256 hex digest of the credential. Never the plaintext.
    pub password_hash: String,
    /// Role.
    pub designation: Designation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn its_rejects_non_positive() {
        assert!(Its::new(0).is_err());
        assert!(Its::new(-3).is_err());
        assert_eq!(Its::new(12345).map(Its::get), Ok(12345));
    }

    #[test]
    fn kind_tags_round_trip() {
        for kind in [UnitKind::Bus, UnitKind::Train, UnitKind::Plane, UnitKind::Shuttle] {
            assert_eq!(UnitKind::parse(kind.as_str()), Ok(kind));
        }
        assert!(UnitKind::parse("boat").is_err());
    }

    #[test]
    fn only_road_kinds_are_seated() {
        assert!(UnitKind::Bus.is_seated());
        assert!(UnitKind::Shuttle.is_seated());
        assert!(!UnitKind::Train.is_seated());
        assert!(!UnitKind::Plane.is_seated());
    }
}
