use chrono::{DateTime, Utc};
use std::fmt;

use crate::types::UserId;

/// Durable Plaid access token owned by exactly one user.
#[derive(Clone, PartialEq)]
pub struct AccessCredential {
    pub user_id: UserId,
    token: String,
    pub item_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccessCredential {
    pub fn new(
        user_id: UserId,
        token: String,
        item_id: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            token,
            item_id,
            created_at,
            updated_at,
        }
    }

    /// The raw access token. Only the gateway should need this.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessCredential")
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .field("item_id", &self.item_id)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}
