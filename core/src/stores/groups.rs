//! Group registration store trait.

use crate::error::Result;
use crate::types::{Group, GroupId, Its};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Store for traveler groups.
pub trait GroupStore: Send + Sync {
    /// Create a group and its membership links in one transaction.
    ///
    /// Every referenced traveler must exist; the caller has already
    /// validated that the leader is not among the members.
    ///
    /// # Errors
    ///
    /// [`crate::Error::NotFound`] naming the first missing traveler
    /// (leader or member); nothing is written in that case.
    fn register_group(
        &self,
        leader: Its,
        members: &[Its],
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<Group>> + Send;

    /// Fetch a group with its members.
    ///
    /// # Errors
    ///
    /// [`crate::Error::NotFound`] if the group does not exist.
    fn group(&self, id: GroupId) -> impl Future<Output = Result<Group>> + Send;
}
