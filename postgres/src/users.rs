//! Operator account store implementation.

use caravan_core::error::{Error, Result};
use caravan_core::stores::UserStore;
use caravan_core::types::User;

use crate::rows::UserRow;
use crate::{storage, unique_violation, PostgresStores};

impl UserStore for PostgresStores {
    async fn create_user(&self, user: &User) -> Result<User> {
        let row: UserRow = sqlx::query_as(
            "INSERT INTO users (username, password_hash, designation) \
             VALUES ($1, $2, $3) \
             RETURNING username, password_hash, designation",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.designation.as_str())
        .fetch_one(self.pool())
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(_) => Error::Duplicate(format!("username {} is taken", user.username)),
            None => Error::Storage(format!("failed to insert user: {e}")),
        })?;
        row.try_into()
    }

    async fn user(&self, username: &str) -> Result<User> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT username, password_hash, designation FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(self.pool())
        .await
        .map_err(storage("failed to fetch user"))?;
        row.ok_or_else(|| Error::not_found("user", username))?
            .try_into()
    }
}
