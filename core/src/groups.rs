//! Group registration: a leader traveler with members behind them.
//!
//! Membership is validated up front (leader excluded from members,
//! duplicates collapsed) and then written atomically by the store, so a
//! group either registers completely or not at all.

use chrono::Utc;

use crate::error::{Error, Result};
use crate::stores::GroupStore;
use crate::types::{Group, GroupId, Its};

/// The group registration service over a [`GroupStore`].
#[derive(Clone, Debug)]
pub struct GroupRegistry<S> {
    store: S,
}

impl<S: GroupStore> GroupRegistry<S> {
    /// Build a registry.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Register a group.
    ///
    /// Duplicate member entries collapse to one; member order is
    /// otherwise preserved. An empty member list is a valid group of one.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the leader appears among the members
    /// - [`Error::NotFound`] naming the first missing traveler; nothing
    ///   is written in that case
    pub async fn register(&self, leader: Its, members: &[Its]) -> Result<Group> {
        let mut unique = Vec::with_capacity(members.len());
        for &member in members {
            if member == leader {
                return Err(Error::Validation(format!(
                    "leader {leader} cannot be listed as a member"
                )));
            }
            if !unique.contains(&member) {
                unique.push(member);
            }
        }

        let group = self.store.register_group(leader, &unique, Utc::now()).await?;
        tracing::info!(
            group = %group.id,
            leader = %group.leader,
            members = group.members.len(),
            "registered group"
        );
        Ok(group)
    }

    /// Fetch a group with its members.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the group does not exist.
    pub async fn group(&self, id: GroupId) -> Result<Group> {
        self.store.group(id).await
    }
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

    async fn stores_with_travelers(ids: &[i64]) -> MemoryStores {
        let stores = MemoryStores::new();
        for &its in ids {
            stores.create_traveler(&seed_traveler(its)).await.unwrap();
        }
        stores
    }

    fn its(raw: i64) -> Its {
        Its::new(raw).unwrap()
    }

    #[tokio::test]
    async fn registers_leader_with_members() {
        let stores = stores_with_travelers(&[1, 2, 3]).await;
        let registry = GroupRegistry::new(stores);

        let group = registry.register(its(1), &[its(2), its(3)]).await.unwrap();
        assert_eq!(group.leader, its(1));
        assert_eq!(group.members, vec![its(2), its(3)]);

        let fetched = registry.group(group.id).await.unwrap();
        assert_eq!(fetched, group);
    }

    #[tokio::test]
    async fn leader_alone_is_a_valid_group() {
        let stores = stores_with_travelers(&[1]).await;
        let registry = GroupRegistry::new(stores);

        let group = registry.register(its(1), &[]).await.unwrap();
        assert!(group.members.is_empty());
    }

    #[tokio::test]
    async fn leader_among_members_is_rejected() {
        let stores = stores_with_travelers(&[1, 2]).await;
        let registry = GroupRegistry::new(stores);

        let err = registry.register(its(1), &[its(2), its(1)]).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn duplicate_members_collapse() {
        let stores = stores_with_travelers(&[1, 2]).await;
        let registry = GroupRegistry::new(stores);

        let group = registry
            .register(its(1), &[its(2), its(2), its(2)])
            .await
            .unwrap();
        assert_eq!(group.members, vec![its(2)]);
    }

    #[tokio::test]
    async fn missing_member_registers_nothing() {
        let stores = stores_with_travelers(&[1, 2]).await;
        let registry = GroupRegistry::new(stores.clone());

        let err = registry
            .register(its(1), &[its(2), its(99)])
            .await
            .unwrap_err();
        assert_eq!(err, Error::not_found("traveler", 99));
        assert!(matches!(
            registry.group(GroupId(1)).await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn missing_leader_registers_nothing() {
        let stores = stores_with_travelers(&[2]).await;
        let registry = GroupRegistry::new(stores);

        let err = registry.register(its(1), &[its(2)]).await.unwrap_err();
        assert_eq!(err, Error::not_found("traveler", 1));
    }
}
