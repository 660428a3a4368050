//! SQLite backing for [`crate::storage::SqliteStore`].
//!
//! One database file per storage area. Every row of `kv_entries` is a single
//! key with its JSON value and version token.

pub mod connection;
pub mod migrations;

pub use connection::Database;
