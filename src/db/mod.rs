//! Database module: the credential store.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows and conversions
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: the storage handle and its queries

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::DbAccessToken;
pub use schema::SQLITE_INIT;
pub use sqlite::{AccessTokenStorage, SqlitePool};
