//! Bearer-token sessions and credential hashing.
//!
//! Login issues an opaque 32-byte random token; only its SHA-256 digest is
//! kept server-side, so a leaked session table cannot be replayed. Sessions
//! expire after [`SESSION_TTL_SECS`]; a stale entry is dropped on the next
//! lookup. Passwords are stored as SHA-256 hex digests and compared in
//! constant time.

use base64::Engine as _;
use caravan_core::types::Designation;
use chrono::{DateTime, Duration, Utc};
use constant_time_eq::constant_time_eq;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::error::AppError;

/// How long a session stays valid after login.
pub const SESSION_TTL_SECS: i64 = 12 * 60 * 60;

/// An authenticated operator session.
#[derive(Clone, Debug)]
pub struct Session {
    /// Operator username.
    pub username: String,
    /// Operator role.
    pub designation: Designation,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Reject the session unless its designation is one of `allowed`.
    ///
    /// Admin passes every guard.
    ///
    /// # Errors
    ///
    /// Returns a 403 [`AppError`] when the role does not qualify.
    pub fn require(&self, allowed: &[Designation]) -> Result<(), AppError> {
        if self.designation == Designation::Admin || allowed.contains(&self.designation) {
            Ok(())
        } else {
            Err(AppError::forbidden(format!(
                "{} role cannot perform this operation",
                self.designation
            )))
        }
    }
}

/// Server-side session storage, keyed by token hash.
pub trait SessionStore: Send + Sync {
    /// Store a session under the hash of `token`.
    fn insert(&self, token: &str, session: Session) -> impl Future<Output = ()> + Send;

    /// Look up the session for `token`, if any.
    fn get(&self, token: &str) -> impl Future<Output = Option<Session>> + Send;

    /// Revoke the session for `token`.
    fn revoke(&self, token: &str) -> impl Future<Output = ()> + Send;
}

/// In-memory session store.
#[derive(Clone, Debug)]
pub struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<[u8; 32], Session>>>,
    ttl: Duration,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::with_ttl(Duration::seconds(SESSION_TTL_SECS))
    }
}

impl InMemorySessionStore {
    /// Create an empty store with the default TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with an explicit TTL.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            ttl,
        }
    }
}

impl SessionStore for InMemorySessionStore {
    fn insert(&self, token: &str, session: Session) -> impl Future<Output = ()> + Send {
        let sessions = Arc::clone(&self.sessions);
        let key = hash_token(token);

        async move {
            if let Ok(mut guard) = sessions.lock() {
                guard.insert(key, session);
            }
        }
    }

    fn get(&self, token: &str) -> impl Future<Output = Option<Session>> + Send {
        let sessions = Arc::clone(&self.sessions);
        let key = hash_token(token);
        let ttl = self.ttl;

        async move {
            let mut guard = sessions.lock().ok()?;
            let session = guard.get(&key)?.clone();
            if Utc::now() - session.created_at > ttl {
                guard.remove(&key);
                return None;
            }
            Some(session)
        }
    }

    fn revoke(&self, token: &str) -> impl Future<Output = ()> + Send {
        let sessions = Arc::clone(&self.sessions);
        let key = hash_token(token);

        async move {
            if let Ok(mut guard) = sessions.lock() {
                guard.remove(&key);
            }
        }
    }
}

/// Extract the bearer token from the Authorization header.
///
/// # Errors
///
/// Returns a 401 [`AppError`] when the header is missing or malformed.
pub fn bearer_token(headers: &axum::http::HeaderMap) -> Result<&str, AppError> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::unauthorized("missing bearer token"))
}

/// Generate an opaque URL-safe bearer token from 32 random bytes.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn hash_token(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

/// SHA-256 hex digest of a password, the at-rest form.
#[must_use]
pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    let mut out = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Constant-time comparison of a candidate password against a stored hash.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    constant_time_eq(hash_password(password).as_bytes(), stored_hash.as_bytes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("hunter2");
        assert_eq!(hash.len(), 64);
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn tokens_are_unique_and_opaque() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert!(a.len() >= 43);
    }

    #[tokio::test]
    async fn sessions_are_stored_by_hash_and_revocable() {
        let store = InMemorySessionStore::new();
        let token = generate_token();
        store
            .insert(
                &token,
                Session {
                    username: "alice".into(),
                    designation: Designation::Customs,
                    created_at: Utc::now(),
                },
            )
            .await;

        let session = store.get(&token).await.unwrap();
        assert_eq!(session.username, "alice");
        assert!(store.get("other-token").await.is_none());

        store.revoke(&token).await;
        assert!(store.get(&token).await.is_none());
    }

    #[tokio::test]
    async fn stale_sessions_expire_on_lookup() {
        let store = InMemorySessionStore::with_ttl(Duration::hours(1));
        let fresh = generate_token();
        let stale = generate_token();
        store
            .insert(
                &fresh,
                Session {
                    username: "alice".into(),
                    designation: Designation::Customs,
                    created_at: Utc::now(),
                },
            )
            .await;
        store
            .insert(
                &stale,
                Session {
                    username: "bob".into(),
                    designation: Designation::Customs,
                    created_at: Utc::now() - Duration::hours(2),
                },
            )
            .await;

        assert!(store.get(&fresh).await.is_some());
        assert!(store.get(&stale).await.is_none());
        // The expired entry is gone, not just hidden.
        assert!(store.get(&stale).await.is_none());
    }

    #[test]
    fn admin_passes_every_guard() {
        let session = Session {
            username: "root".into(),
            designation: Designation::Admin,
            created_at: Utc::now(),
        };
        assert!(session.require(&[Designation::Arrival]).is_ok());

        let arrival = Session {
            username: "gate".into(),
            designation: Designation::Arrival,
            created_at: Utc::now(),
        };
        assert!(arrival.require(&[Designation::Customs]).is_err());
    }
}
