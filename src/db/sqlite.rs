use crate::db::models::DbAccessToken;
use crate::db::schema::SQLITE_INIT;
use crate::error::DoughError;
use crate::plaid::credentials::AccessCredential;
use crate::types::UserId;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub type SqlitePool = Pool<Sqlite>;

const SELECT_BY_USER: &str = r#"SELECT id, user_id, token, item_id, created_at, updated_at
    FROM plaid_access_tokens WHERE user_id = ?"#;

/// Persistence for one access token per user.
#[derive(Clone)]
pub struct AccessTokenStorage {
    pool: SqlitePool,
}

impl AccessTokenStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `database_url` and apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self, DoughError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
        let storage = Self::new(pool);
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), DoughError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Create the user's credential, or replace its token if one exists.
    ///
    /// Uses SQLite `INSERT ... ON CONFLICT(user_id) DO UPDATE ... RETURNING`, so
    /// concurrent writers for one user still leave a single row and each caller
    /// gets back the row it wrote.
    pub async fn upsert(
        &self,
        user_id: &UserId,
        token: &str,
        item_id: Option<&str>,
    ) -> Result<AccessCredential, DoughError> {
        let now = Utc::now();
        let row: DbAccessToken = sqlx::query_as(
            r#"
            INSERT INTO plaid_access_tokens (user_id, token, item_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                token=excluded.token,
                item_id=excluded.item_id,
                updated_at=excluded.updated_at
            RETURNING id, user_id, token, item_id, created_at, updated_at
            "#,
        )
        .bind(user_id.as_str())
        .bind(token)
        .bind(item_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        debug!(user_id = %user_id, id = row.id, "access token row upserted");
        Ok(row.into())
    }

    /// Look up the user's credential; `None` means "not yet linked".
    pub async fn get_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<AccessCredential>, DoughError> {
        let row: Option<DbAccessToken> = sqlx::query_as(SELECT_BY_USER)
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn count_for_user(&self, user_id: &UserId) -> Result<i64, DoughError> {
        let rec: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM plaid_access_tokens WHERE user_id = ?")
                .bind(user_id.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(rec.0)
    }
}
