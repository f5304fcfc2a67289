//! `SQLite` persistence for skill records.

pub mod error;
pub mod sqlite;

pub use error::MemoryError;
pub use sqlite::SqliteStore;
