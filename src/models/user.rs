//! User model

use serde::{Deserialize, Serialize};

/// Authenticated user, persisted as the sole session record.
///
/// Created on successful login or registration and destroyed on logout or
/// when the backend rejects the held token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Backend user id
    pub id: i64,
    /// Email address (also used as the check-in username)
    pub email: String,
    /// Name shown in the UI
    pub display_name: String,
    /// Bearer token for authenticated requests
    pub token: String,
}

impl User {
    /// Whether the user holds a usable token
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }
}
