//! PostgreSQL store implementations for Caravan.
//!
//! [`PostgresStores`] implements every store trait from `caravan-core` on
//! top of a shared [`PgPool`]. Multi-row operations run in transactions;
//! uniqueness invariants are backed by database constraints, and a
//! constraint violation is mapped back to the domain error the constraint
//! encodes.

use caravan_core::error::{Error, Result};
use sqlx::PgPool;

mod bookings;
mod groups;
mod processing;
mod rows;
mod travelers;
mod users;

/// PostgreSQL implementation of every Caravan store trait.
#[derive(Clone, Debug)]
pub struct PostgresStores {
    pool: PgPool,
}

impl PostgresStores {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the database at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url)
            .await
            .map_err(|e| Error::Storage(format!("failed to connect: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Storage(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a plain query failure to [`Error::Storage`].
pub(crate) fn storage(context: &'static str) -> impl Fn(sqlx::Error) -> Error {
    move |e| Error::Storage(format!("{context}: {e}"))
}

/// The constraint name behind a unique violation, if that is what `err` is.
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<String> {
    if let sqlx::Error::Database(db) = err {
        if db.is_unique_violation() {
            return Some(db.constraint().unwrap_or_default().to_string());
        }
    }
    None
}
