//! Shared application state.

use axum::http::HeaderMap;
use caravan_core::{Allocator, GroupRegistry, Pipeline, Stores};

use crate::error::AppError;
use crate::session::{bearer_token, InMemorySessionStore, Session, SessionStore};

/// State shared by every handler, generic over the store backend so tests
/// can run the full router against in-memory stores.
#[derive(Clone, Debug)]
pub struct AppState<S: Stores> {
    /// Store backend.
    pub stores: S,
    /// Active sessions.
    pub sessions: InMemorySessionStore,
    batch_threshold: u64,
}

impl<S: Stores> AppState<S> {
    /// Build application state.
    pub fn new(stores: S, batch_threshold: u64) -> Self {
        Self {
            stores,
            sessions: InMemorySessionStore::new(),
            batch_threshold,
        }
    }

    /// Processing pipeline bound to the store backend.
    pub fn pipeline(&self) -> Pipeline<S> {
        Pipeline::with_threshold(self.stores.clone(), self.batch_threshold)
    }

    /// Booking allocator bound to the store backend.
    pub fn allocator(&self) -> Allocator<S> {
        Allocator::new(self.stores.clone())
    }

    /// Group registry bound to the store backend.
    pub fn groups(&self) -> GroupRegistry<S> {
        GroupRegistry::new(self.stores.clone())
    }

    /// Resolve the bearer token in `headers` to a session.
    ///
    /// # Errors
    ///
    /// Returns a 401 [`AppError`] when the header is missing, malformed,
    /// or names a revoked token.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Session, AppError> {
        let token = bearer_token(headers)?;

        self.sessions
            .get(token)
            .await
            .ok_or_else(|| AppError::unauthorized("invalid or expired session"))
    }
}
