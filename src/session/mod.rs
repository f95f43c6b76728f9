//! Session persistence
//!
//! The authenticated user is stored as JSON text in the key-value store under
//! `auth_user`. Reads and writes fail soft: a corrupt record or a storage
//! fault yields "no session" rather than an error, so a broken store can
//! never lock the user out of the login screen.

use std::sync::Arc;

use crate::models::User;
use crate::storage::KvStore;

/// Storage key for the serialized session record
pub const AUTH_USER_KEY: &str = "auth_user";

/// Persists and restores the authenticated identity.
///
/// Shared process-wide behind an `Arc`; the API gateway clears it when the
/// backend rejects the held token.
pub struct SessionStore {
    store: Arc<dyn KvStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Read the persisted session, if any. Read and parse errors are logged
    /// and mapped to `None`.
    pub async fn restore(&self) -> Option<User> {
        let stored = match self.store.get(AUTH_USER_KEY).await {
            Ok(stored) => stored?,
            Err(err) => {
                tracing::error!(error = %err, "failed to read session record");
                return None;
            }
        };

        match serde_json::from_str(&stored) {
            Ok(user) => Some(user),
            Err(err) => {
                tracing::warn!(error = %err, "stored session record is malformed");
                None
            }
        }
    }

    /// Write the session record, or clear it when `user` is `None`.
    /// Storage faults are logged and swallowed.
    pub async fn persist(&self, user: Option<&User>) {
        let result = match user {
            Some(user) => match serde_json::to_string(user) {
                Ok(json) => self.store.set(AUTH_USER_KEY, &json).await,
                Err(err) => {
                    tracing::error!(error = %err, "failed to serialize session record");
                    return;
                }
            },
            None => self.store.remove(AUTH_USER_KEY).await,
        };

        if let Err(err) = result {
            tracing::error!(error = %err, "failed to persist session record");
        }
    }

    /// Drop the persisted session
    pub async fn clear(&self) {
        self.persist(None).await;
    }

    /// The current bearer token, if a session with a non-empty token exists
    pub async fn token(&self) -> Option<String> {
        self.restore()
            .await
            .filter(User::has_token)
            .map(|user| user.token)
    }
}
