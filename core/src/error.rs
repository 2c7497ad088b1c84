//! Error taxonomy for Caravan domain operations.

use thiserror::Error;

/// Result type alias for domain operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the traveler intake, processing, and booking flows.
///
/// Every variant maps to a distinct user-facing outcome at the request
/// boundary; none of them is allowed to propagate as a crash.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════
    // Reference Errors
    // ═══════════════════════════════════════════════════════════
    /// A referenced entity does not exist.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Entity kind, e.g. "traveler" or "transport unit".
        resource: &'static str,
        /// Identifier the caller supplied.
        id: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Uniqueness & Capacity Errors
    // ═══════════════════════════════════════════════════════════
    /// A business-level uniqueness policy was violated, e.g. processing
    /// the same traveler twice for one operator.
    #[error("{0}")]
    Duplicate(String),

    /// A storage-level constraint violation, or a race lost after the
    /// bounded retries. The transaction was rolled back.
    #[error("{0}")]
    Conflict(String),

    /// A transport unit has no seats remaining.
    #[error("transport unit {unit} is full")]
    Full {
        /// Identifier of the exhausted unit.
        unit: i64,
    },

    // ═══════════════════════════════════════════════════════════
    // Input Errors
    // ═══════════════════════════════════════════════════════════
    /// Malformed input, e.g. an unparsable date or an empty name.
    #[error("{0}")]
    Validation(String),

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════
    /// The storage backend failed. Not exposed verbatim to clients.
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Build a [`Error::NotFound`] for a resource and id.
    pub fn not_found(resource: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Returns `true` if this error is a lost race that the caller may
    /// retry (the allocator uses this to drive its bounded retry loop).
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns `true` if this error is due to invalid caller input rather
    /// than system state.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Duplicate(_) | Self::Validation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_resource_and_id() {
        let err = Error::not_found("traveler", 12345);
        assert_eq!(err.to_string(), "traveler 12345 not found");
        assert!(err.is_user_error());
    }

    #[test]
    fn conflict_is_retryable() {
        assert!(Error::Conflict("seat taken".into()).is_conflict());
        assert!(!Error::Full { unit: 1 }.is_conflict());
    }
}
