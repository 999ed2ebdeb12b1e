use crate::plaid::credentials::AccessCredential;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Clone, PartialEq, FromRow)]
pub struct DbAccessToken {
    pub id: i64,
    pub user_id: String,
    pub token: String,
    pub item_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbAccessToken> for AccessCredential {
    fn from(d: DbAccessToken) -> Self {
        AccessCredential::new(
            UserId::new(d.user_id),
            d.token,
            d.item_id,
            d.created_at,
            d.updated_at,
        )
    }
}
