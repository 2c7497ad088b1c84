//! Operator account store trait.

use crate::error::Result;
use crate::types::User;
use std::future::Future;

/// Store for operator accounts.
pub trait UserStore: Send + Sync {
    /// Create an operator account.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Duplicate`] if the username is taken.
    fn create_user(&self, user: &User) -> impl Future<Output = Result<User>> + Send;

    /// Fetch an account by username.
    ///
    /// # Errors
    ///
    /// [`crate::Error::NotFound`] if no such account exists.
    fn user(&self, username: &str) -> impl Future<Output = Result<User>> + Send;
}
