//! Group store implementation.

use caravan_core::error::{Error, Result};
use caravan_core::stores::GroupStore;
use caravan_core::types::{Group, GroupId, Its};
use chrono::{DateTime, Utc};

use crate::{storage, PostgresStores};

impl GroupStore for PostgresStores {
    async fn register_group(
        &self,
        leader: Its,
        members: &[Its],
        at: DateTime<Utc>,
    ) -> Result<Group> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(storage("failed to begin group registration"))?;

        // Leader first, then members in order, so the first missing
        // traveler is the one named in the error.
        for its in std::iter::once(leader).chain(members.iter().copied()) {
            let (exists,): (bool,) =
                sqlx::query_as("SELECT EXISTS(SELECT 1 FROM travelers WHERE its = $1)")
                    .bind(its.get())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(storage("failed traveler check"))?;
            if !exists {
                return Err(Error::not_found("traveler", its));
            }
        }

        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO groups (leader, created_at) VALUES ($1, $2) RETURNING id",
        )
        .bind(leader.get())
        .bind(at)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage("failed to insert group"))?;

        for (position, member) in members.iter().enumerate() {
            sqlx::query(
                "INSERT INTO group_members (group_id, its, position) VALUES ($1, $2, $3)",
            )
            .bind(id)
            .bind(member.get())
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .execute(&mut *tx)
            .await
            .map_err(storage("failed to insert member"))?;
        }

        tx.commit()
            .await
            .map_err(storage("failed to commit group registration"))?;

        Ok(Group {
            id: GroupId(id),
            leader,
            members: members.to_vec(),
            created_at: at,
        })
    }

    async fn group(&self, id: GroupId) -> Result<Group> {
        let row: Option<(i64, DateTime<Utc>)> =
            sqlx::query_as("SELECT leader, created_at FROM groups WHERE id = $1")
                .bind(id.0)
                .fetch_optional(self.pool())
                .await
                .map_err(storage("failed to fetch group"))?;
        let (leader, created_at) = row.ok_or_else(|| Error::not_found("group", id))?;

        let members: Vec<(i64,)> = sqlx::query_as(
            "SELECT its FROM group_members WHERE group_id = $1 ORDER BY position",
        )
        .bind(id.0)
        .fetch_all(self.pool())
        .await
        .map_err(storage("failed to list members"))?;

        Ok(Group {
            id,
            leader: Its::new(leader)?,
            members: members
                .into_iter()
                .map(|(its,)| Its::new(its))
                .collect::<Result<Vec<Its>>>()?,
            created_at,
        })
    }
}
