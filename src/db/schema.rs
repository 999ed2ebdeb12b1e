//! SQL DDL for initializing the credential storage.
//! SQLite-first design; can be adapted for other RDBMS.

/// SQLite schema with:
/// - `id` INTEGER PRIMARY KEY AUTOINCREMENT
/// - `user_id` UNIQUE: at most one access token per user
/// - timestamps stored as RFC3339 text
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS plaid_access_tokens (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL UNIQUE,
    token TEXT NOT NULL,
    item_id TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;
